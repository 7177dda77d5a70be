mod common;

use common::{
    admin, assign, create_position, create_unit, insert_caller, insert_member, insert_region,
    service, setup,
};
use orgchart_core::{DirectoryError, HierarchyFilter, Unit, UnitScope};
use uuid::Uuid;

#[test]
fn coordinator_requesting_other_region_is_forbidden() {
    let conn = setup();
    let north = insert_region(&conn, "north", "North");
    let south = insert_region(&conn, "south", "South");
    let coordinator = insert_caller(&conn, "coordinator", Some(north));
    create_unit(&conn, Unit::regional(south, "South Chapter", "south"));
    let service = service(&conn);

    assert!(matches!(
        service.get_hierarchy(coordinator, HierarchyFilter::regional(south)),
        Err(DirectoryError::Forbidden(_))
    ));
    assert!(matches!(
        service.get_chart_data(coordinator, HierarchyFilter::regional(south)),
        Err(DirectoryError::Forbidden(_))
    ));
}

#[test]
fn coordinator_filters_are_forced_to_own_region() {
    let conn = setup();
    let north = insert_region(&conn, "north", "North");
    let coordinator = insert_caller(&conn, "coordinator", Some(north));
    let chapter = create_unit(&conn, Unit::regional(north, "North Chapter", "north"));
    create_unit(&conn, Unit::headquarters("Board", "board"));

    let forest = service(&conn)
        .get_hierarchy(coordinator, HierarchyFilter::headquarters())
        .unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].unit.id, chapter.id);
    assert_eq!(forest[0].unit.scope, UnitScope::Regional);
}

#[test]
fn coordinator_cannot_open_units_outside_own_region() {
    let conn = setup();
    let north = insert_region(&conn, "north", "North");
    let coordinator = insert_caller(&conn, "coordinator", Some(north));
    let board = create_unit(&conn, Unit::headquarters("Board", "board"));
    let chapter = create_unit(&conn, Unit::regional(north, "North Chapter", "north"));
    let service = service(&conn);

    assert!(matches!(
        service.get_unit_data(coordinator, board.id),
        Err(DirectoryError::Forbidden(_))
    ));
    assert!(matches!(
        service.get_breadcrumb(coordinator, board.id),
        Err(DirectoryError::Forbidden(_))
    ));
    assert_eq!(
        service.get_unit_data(coordinator, chapter.id).unwrap().unit.id,
        chapter.id
    );
}

#[test]
fn callers_without_directory_access_are_forbidden() {
    let conn = setup();
    create_unit(&conn, Unit::headquarters("Board", "board"));
    let member = insert_caller(&conn, "member", None);
    let unassigned = insert_caller(&conn, "coordinator", None);
    let unknown = Uuid::new_v4();
    let service = service(&conn);

    for caller in [member, unassigned, unknown] {
        let err = service
            .get_hierarchy(caller, HierarchyFilter::headquarters())
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Forbidden(_)));
        assert_eq!(err.code(), "forbidden");
    }
}

#[test]
fn elevated_callers_see_every_region() {
    let conn = setup();
    let north = insert_region(&conn, "north", "North");
    let south = insert_region(&conn, "south", "South");
    create_unit(&conn, Unit::regional(south, "South Chapter", "south"));
    let super_admin = insert_caller(&conn, "super_admin", None);
    let service = service(&conn);

    let forest = service
        .get_hierarchy(super_admin, HierarchyFilter::regional(south))
        .unwrap();
    assert_eq!(forest.len(), 1);

    let regions = service.list_regions(super_admin).unwrap();
    let ids: Vec<Uuid> = regions.iter().map(|region| region.id).collect();
    assert_eq!(ids, vec![north, south]);
}

#[test]
fn coordinator_region_list_contains_only_own_region() {
    let conn = setup();
    let north = insert_region(&conn, "north", "North");
    insert_region(&conn, "south", "South");
    let coordinator = insert_caller(&conn, "coordinator", Some(north));

    let regions = service(&conn).list_regions(coordinator).unwrap();
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].id, north);
}

#[test]
fn only_elevated_callers_end_assignments() {
    let conn = setup();
    let north = insert_region(&conn, "north", "North");
    let coordinator = insert_caller(&conn, "coordinator", Some(north));
    let caller = admin(&conn);
    let chapter = create_unit(&conn, Unit::regional(north, "North Chapter", "north"));
    let lead = create_position(&conn, &chapter, "Lead", "lead");
    let person = insert_member(&conn, "Nora North", None, None, "active");
    let assignment = assign(&conn, lead.id, person, 1_000);
    let service = service(&conn);

    assert!(matches!(
        service.end_assignment(coordinator, assignment.id, 2_000),
        Err(DirectoryError::Forbidden(_))
    ));
    let ended = service.end_assignment(caller, assignment.id, 2_000).unwrap();
    assert_eq!(ended.ended_at, Some(2_000));
}
