use schempaste::error::LevelRole;
use schempaste::{
    run, BlockEntity, BlockPos, BlockState, Dimension, Entity, Level, LevelError, LevelLoader,
    PasteConfig, PasteError, SelectionBox, SelectionGroup,
};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const WORLD: &str = "/worlds/target";

type Log = Rc<RefCell<Vec<String>>>;

/// Level that records every lifecycle call and the positions written to it.
struct FakeLevel {
    path: PathBuf,
    dimensions: Vec<Dimension>,
    bounds: SelectionGroup,
    log: Log,
    writes: Rc<RefCell<Vec<BlockPos>>>,
    fail_writes: bool,
}

impl Level for FakeLevel {
    fn path(&self) -> &Path {
        &self.path
    }

    fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    fn bounds(&self, _dimension: &Dimension) -> Result<SelectionGroup, LevelError> {
        Ok(self.bounds.clone())
    }

    fn block(&mut self, _dimension: &Dimension, _pos: BlockPos) -> Result<Option<BlockState>, LevelError> {
        Ok(Some(BlockState::new("minecraft:stone")))
    }

    fn set_block(
        &mut self,
        _dimension: &Dimension,
        pos: BlockPos,
        _block: &BlockState,
    ) -> Result<(), LevelError> {
        if self.fail_writes {
            return Err(LevelError::Unsupported("writing to this fake"));
        }
        self.writes.borrow_mut().push(pos);
        Ok(())
    }

    fn block_entity(
        &mut self,
        _dimension: &Dimension,
        _pos: BlockPos,
    ) -> Result<Option<BlockEntity>, LevelError> {
        Ok(None)
    }

    fn set_block_entity(
        &mut self,
        _dimension: &Dimension,
        _block_entity: BlockEntity,
    ) -> Result<(), LevelError> {
        Ok(())
    }

    fn remove_block_entity(&mut self, _dimension: &Dimension, _pos: BlockPos) -> Result<(), LevelError> {
        Ok(())
    }

    fn entities_in(
        &mut self,
        _dimension: &Dimension,
        _selection: &SelectionBox,
    ) -> Result<Vec<Entity>, LevelError> {
        self.log.borrow_mut().push(format!("entities:{}", self.path.display()));
        Ok(Vec::new())
    }

    fn add_entity(&mut self, _dimension: &Dimension, _entity: Entity) -> Result<(), LevelError> {
        Ok(())
    }

    fn save(&mut self) -> Result<(), LevelError> {
        self.log.borrow_mut().push(format!("save:{}", self.path.display()));
        Ok(())
    }

    fn close(&mut self) -> Result<(), LevelError> {
        self.log.borrow_mut().push(format!("close:{}", self.path.display()));
        Ok(())
    }
}

#[derive(Default)]
struct FakeLoader {
    log: Log,
    writes: Rc<RefCell<Vec<BlockPos>>>,
    schematic_bounds: SelectionGroup,
    fail_writes: bool,
    missing_world: bool,
}

impl FakeLoader {
    fn with_box(selection: SelectionBox) -> Self {
        FakeLoader {
            schematic_bounds: SelectionGroup::from_box(selection),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl LevelLoader for FakeLoader {
    fn load_level(&self, path: &Path) -> Result<Box<dyn Level>, LevelError> {
        self.log.borrow_mut().push(format!("open:{}", path.display()));
        let is_world = path == Path::new(WORLD);
        if is_world && self.missing_world {
            return Err(LevelError::UnsupportedFormat("no level.dat".to_string()));
        }
        Ok(Box::new(FakeLevel {
            path: path.to_path_buf(),
            dimensions: if is_world {
                vec![Dimension::overworld(), Dimension::nether()]
            } else {
                vec![Dimension::structure()]
            },
            bounds: if is_world {
                SelectionGroup::new()
            } else {
                self.schematic_bounds.clone()
            },
            log: self.log.clone(),
            writes: self.writes.clone(),
            fail_writes: is_world && self.fail_writes,
        }))
    }
}

fn tile_box() -> SelectionBox {
    SelectionBox::new((0, 0, 0), (4, 6, 3))
}

#[test]
fn test_reference_anchor_and_call_order() {
    let loader = FakeLoader::with_box(tile_box());
    let config = PasteConfig::new("/tiles/10_5_20_4_6_3.schematic", WORLD, 2, 1);

    let summary = run(&config, &loader).unwrap();
    assert_eq!(summary.pasted.len(), 1);
    assert_eq!(summary.pasted[0].anchor, (7, 22, 10));
    assert_eq!(
        summary.pasted[0].summary.destination,
        SelectionBox::new((5, 19, 9), (9, 25, 12))
    );

    assert_eq!(
        loader.calls(),
        vec![
            format!("open:{}", WORLD),
            "open:/tiles/10_5_20_4_6_3.schematic".to_string(),
            "close:/tiles/10_5_20_4_6_3.schematic".to_string(),
            format!("save:{}", WORLD),
            format!("close:{}", WORLD),
        ]
    );

    let writes = loader.writes.borrow();
    assert_eq!(writes.len(), 4 * 6 * 3);
    assert_eq!(writes.first(), Some(&(5, 19, 9)));
    assert_eq!(writes.last(), Some(&(8, 24, 11)));
}

#[test]
fn test_entities_are_not_pasted() {
    let loader = FakeLoader::with_box(tile_box());
    let config = PasteConfig::new("/tiles/0_0_0_4_6_3.schematic", WORLD, 0, 0);
    run(&config, &loader).unwrap();
    assert!(loader.calls().iter().all(|call| !call.starts_with("entities:")));
}

#[test]
fn test_paste_failure_closes_both_and_skips_save() {
    let loader = FakeLoader {
        fail_writes: true,
        ..FakeLoader::with_box(tile_box())
    };
    let config = PasteConfig::new("/tiles/10_5_20_4_6_3.schematic", WORLD, 2, 1);

    let err = run(&config, &loader).unwrap_err();
    assert!(matches!(err, PasteError::Paste { .. }));

    let calls = loader.calls();
    assert!(!calls.iter().any(|call| call.starts_with("save:")));
    assert!(calls.contains(&"close:/tiles/10_5_20_4_6_3.schematic".to_string()));
    assert!(calls.contains(&format!("close:{}", WORLD)));
}

#[test]
fn test_bad_filename_opens_nothing() {
    let loader = FakeLoader::with_box(tile_box());
    for name in ["/tiles/10_5_20_4_6.schematic", "/tiles/10_5_20_4_6_x.schematic"] {
        let config = PasteConfig::new(name, WORLD, 0, 0);
        let err = run(&config, &loader).unwrap_err();
        assert!(matches!(err, PasteError::InvalidFilename { .. }), "{}", err);
    }
    assert!(loader.calls().is_empty());
}

#[test]
fn test_every_filename_is_checked_before_opening() {
    let loader = FakeLoader::with_box(tile_box());
    let mut config = PasteConfig::new("/tiles/0_0_0_4_6_3.schematic", WORLD, 0, 0);
    config.schematics.push(PathBuf::from("/tiles/broken.schematic"));

    assert!(run(&config, &loader).is_err());
    assert!(loader.calls().is_empty());
}

#[test]
fn test_zero_selection_boxes_fails() {
    let loader = FakeLoader::default();
    let config = PasteConfig::new("/tiles/0_0_0_4_6_3.schematic", WORLD, 0, 0);

    let err = run(&config, &loader).unwrap_err();
    assert!(matches!(err, PasteError::EmptySelection { .. }));

    let calls = loader.calls();
    assert!(!calls.iter().any(|call| call.starts_with("save:")));
    assert_eq!(
        calls.iter().filter(|call| call.starts_with("close:")).count(),
        2
    );
}

#[test]
fn test_world_open_failure_names_the_world() {
    let loader = FakeLoader {
        missing_world: true,
        ..FakeLoader::with_box(tile_box())
    };
    let config = PasteConfig::new("/tiles/0_0_0_4_6_3.schematic", WORLD, 0, 0);

    match run(&config, &loader) {
        Err(PasteError::LoadLevel { role, path, .. }) => {
            assert_eq!(role, LevelRole::World);
            assert_eq!(path, PathBuf::from(WORLD));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(loader.calls(), vec![format!("open:{}", WORLD)]);
}

#[test]
fn test_schematic_list_saves_once() {
    let loader = FakeLoader::with_box(SelectionBox::new((0, 0, 0), (1, 1, 1)));
    let mut config = PasteConfig::new("/tiles/0_0_0_1_1_1.schematic", WORLD, 0, 0);
    config
        .schematics
        .push(PathBuf::from("/tiles/16_0_0_1_1_1.schematic"));

    let summary = run(&config, &loader).unwrap();
    assert_eq!(summary.pasted.len(), 2);
    assert_eq!(summary.pasted[1].anchor, (0, 1, 16));

    let calls = loader.calls();
    assert_eq!(calls.iter().filter(|c| c.starts_with("save:")).count(), 1);
    assert_eq!(calls.last(), Some(&format!("close:{}", WORLD)));
    assert_eq!(loader.writes.borrow().as_slice(), &[(0, 1, 0), (0, 1, 16)]);
}
