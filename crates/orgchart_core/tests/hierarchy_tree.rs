mod common;

use common::{admin, create_unit, deactivate_unit, insert_region, reparent, service, setup};
use orgchart_core::directory::region::SqliteRegionDirectory;
use orgchart_core::repo::unit_repo::SqliteUnitRepository;
use orgchart_core::service::hierarchy::{forest_size, HierarchyBuilder};
use orgchart_core::{
    to_chart_nodes, DirectoryConfig, DirectoryError, HierarchyFilter, NotFoundKind,
    SqliteOrgDirectoryService, Unit, UnitNode, UnitScope,
};
use std::collections::HashSet;
use uuid::Uuid;

fn collect_ids(nodes: &[UnitNode], ids: &mut Vec<Uuid>) {
    for node in nodes {
        ids.push(node.unit.id);
        collect_ids(&node.children, ids);
    }
}

#[test]
fn headquarters_forest_nests_children_in_sibling_order() {
    let conn = setup();
    let caller = admin(&conn);
    let board = create_unit(&conn, Unit::headquarters("Board", "board"));
    create_unit(
        &conn,
        Unit::headquarters("Treasury", "treasury")
            .with_parent(board.id)
            .with_display_order(2),
    );
    create_unit(
        &conn,
        Unit::headquarters("Secretariat", "secretariat")
            .with_parent(board.id)
            .with_display_order(1),
    );
    let region = insert_region(&conn, "north", "North");
    create_unit(&conn, Unit::regional(region, "North Chapter", "north"));

    let forest = service(&conn)
        .get_hierarchy(caller, HierarchyFilter::headquarters())
        .unwrap();

    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].unit.id, board.id);
    let children: Vec<&str> = forest[0]
        .children
        .iter()
        .map(|node| node.unit.name.as_str())
        .collect();
    assert_eq!(children, vec!["Secretariat", "Treasury"]);
}

#[test]
fn regional_forest_contains_only_that_region() {
    let conn = setup();
    let caller = admin(&conn);
    let north = insert_region(&conn, "north", "North");
    let south = insert_region(&conn, "south", "South");
    let north_root = create_unit(&conn, Unit::regional(north, "North Chapter", "north"));
    create_unit(
        &conn,
        Unit::regional(north, "North Youth", "north-youth").with_parent(north_root.id),
    );
    create_unit(&conn, Unit::regional(south, "South Chapter", "south"));
    create_unit(&conn, Unit::headquarters("Board", "board"));

    let forest = service(&conn)
        .get_hierarchy(caller, HierarchyFilter::regional(north))
        .unwrap();

    assert_eq!(forest_size(&forest), 2);
    let mut ids = Vec::new();
    collect_ids(&forest, &mut ids);
    assert!(ids.contains(&north_root.id));
    assert!(forest
        .iter()
        .all(|node| node.unit.region_id == Some(north)));
}

#[test]
fn units_under_inactive_parent_are_promoted_to_roots() {
    let conn = setup();
    let caller = admin(&conn);
    let board = create_unit(&conn, Unit::headquarters("Board", "board"));
    let finance = create_unit(
        &conn,
        Unit::headquarters("Finance", "finance").with_parent(board.id),
    );
    let audit = create_unit(
        &conn,
        Unit::headquarters("Audit", "audit").with_parent(finance.id),
    );
    deactivate_unit(&conn, &board);

    let forest = service(&conn)
        .get_hierarchy(caller, HierarchyFilter::headquarters())
        .unwrap();

    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].unit.id, finance.id);
    assert_eq!(forest[0].unit.parent_id, Some(board.id));
    assert_eq!(forest[0].children[0].unit.id, audit.id);
}

#[test]
fn forest_roots_are_true_roots_and_ids_are_unique() {
    let conn = setup();
    let caller = admin(&conn);
    let a = create_unit(&conn, Unit::headquarters("A", "a"));
    let b = create_unit(&conn, Unit::headquarters("B", "b").with_parent(a.id));
    create_unit(&conn, Unit::headquarters("C", "c").with_parent(b.id));
    let d = create_unit(&conn, Unit::headquarters("D", "d"));
    create_unit(&conn, Unit::headquarters("E", "e").with_parent(d.id));
    deactivate_unit(&conn, &d);

    let forest = service(&conn)
        .get_hierarchy(caller, HierarchyFilter::headquarters())
        .unwrap();

    let mut ids = Vec::new();
    collect_ids(&forest, &mut ids);
    let unique: HashSet<Uuid> = ids.iter().copied().collect();
    assert_eq!(ids.len(), 4);
    assert_eq!(unique.len(), ids.len());
    for root in &forest {
        assert!(root
            .unit
            .parent_id
            .map_or(true, |parent| !unique.contains(&parent)));
    }
}

#[test]
fn malformed_filters_are_rejected() {
    let conn = setup();
    let caller = admin(&conn);
    let service = service(&conn);

    let missing_region = HierarchyFilter {
        scope: UnitScope::Regional,
        region_id: None,
        active_only: true,
    };
    assert!(matches!(
        service.get_hierarchy(caller, missing_region),
        Err(DirectoryError::InvalidFilter(_))
    ));

    let unknown = Uuid::new_v4();
    match service.get_hierarchy(caller, HierarchyFilter::regional(unknown)) {
        Err(DirectoryError::NotFound { kind, id }) => {
            assert_eq!(kind, NotFoundKind::Region);
            assert_eq!(id, unknown);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn cyclic_ancestry_fails_with_integrity_error() {
    let conn = setup();
    let caller = admin(&conn);
    let a = create_unit(&conn, Unit::headquarters("A", "a"));
    let b = create_unit(&conn, Unit::headquarters("B", "b").with_parent(a.id));
    create_unit(&conn, Unit::headquarters("Standalone", "standalone"));
    reparent(&conn, &a, &b);

    let err = service(&conn)
        .get_hierarchy(caller, HierarchyFilter::headquarters())
        .unwrap_err();
    assert!(matches!(err, DirectoryError::IntegrityError(_)));
    assert_eq!(err.code(), "integrity_error");
}

#[test]
fn configured_max_depth_bounds_nesting() {
    let conn = setup();
    let caller = admin(&conn);
    let mut parent = create_unit(&conn, Unit::headquarters("L0", "l0"));
    for level in 1..4 {
        parent = create_unit(
            &conn,
            Unit::headquarters(format!("L{level}"), format!("l{level}")).with_parent(parent.id),
        );
    }

    let shallow = DirectoryConfig {
        max_depth: 3,
        ..DirectoryConfig::default()
    };
    let service = SqliteOrgDirectoryService::from_connection(&conn, shallow).unwrap();
    assert!(matches!(
        service.get_hierarchy(caller, HierarchyFilter::headquarters()),
        Err(DirectoryError::IntegrityError(_))
    ));
}

#[test]
fn builder_returns_bare_forest_and_chart_mirrors_it() {
    let conn = setup();
    let board = create_unit(&conn, Unit::headquarters("Board", "board"));
    create_unit(&conn, Unit::headquarters("Finance", "finance").with_parent(board.id));
    create_unit(&conn, Unit::headquarters("Council", "council").with_display_order(1));

    let units = SqliteUnitRepository::try_new(&conn).unwrap();
    let regions = SqliteRegionDirectory::new(&conn);
    let forest = HierarchyBuilder::new(&units, &regions, 64)
        .build_tree(&HierarchyFilter::headquarters())
        .unwrap();
    assert!(forest.iter().all(|node| node.positions.is_empty()));

    let chart = to_chart_nodes(&forest);
    assert_eq!(chart.len(), 2);
    assert_eq!(chart[0].name, "Board");
    assert_eq!(chart[0].children.len(), 1);
    assert_eq!(chart[0].children[0].name, "Finance");
    assert_eq!(chart[1].name, "Council");
    assert!(chart[1].children.is_empty());
}
