mod common;

use common::{assign, create_position, create_unit, insert_member, setup};
use orgchart_core::directory::person::{PersonDirectory, PersonSearch, SqlitePersonDirectory};
use orgchart_core::repo::assignment_repo::SqliteAssignmentRepository;
use orgchart_core::repo::position_repo::SqlitePositionRepository;
use orgchart_core::repo::unit_repo::{SqliteUnitRepository, UnitQuery, UnitRepository};
use orgchart_core::service::enrichment::{EnrichmentPipeline, EnrichmentSummary};
use orgchart_core::service::hierarchy::assemble_forest;
use orgchart_core::{
    CancelFlag, Forest, LookupError, LookupResult, Person, PersonId, PrivacyProjector, Unit,
};
use rusqlite::Connection;
use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

struct FailingPeople;

impl PersonDirectory for FailingPeople {
    fn find_person(&self, _id: PersonId, _: Option<Instant>) -> LookupResult<Option<Person>> {
        Err(LookupError::Unavailable {
            collaborator: "member_directory",
            message: "connection refused".to_string(),
        })
    }

    fn search_people(&self, _: &PersonSearch<'_>) -> LookupResult<Vec<Person>> {
        Err(LookupError::TimedOut {
            collaborator: "member_directory",
        })
    }
}

/// Member directory that overruns any deadline when resolving `slow_name`.
struct SlowForName<'conn> {
    inner: SqlitePersonDirectory<'conn>,
    slow_name: &'static str,
    delay: Duration,
    calls: Cell<usize>,
}

impl PersonDirectory for SlowForName<'_> {
    fn find_person(&self, id: PersonId, _: Option<Instant>) -> LookupResult<Option<Person>> {
        self.calls.set(self.calls.get() + 1);
        let person = self.inner.find_person(id, None)?;
        if person
            .as_ref()
            .is_some_and(|person| person.full_name == self.slow_name)
        {
            std::thread::sleep(self.delay);
        }
        Ok(person)
    }

    fn search_people(&self, _: &PersonSearch<'_>) -> LookupResult<Vec<Person>> {
        Ok(Vec::new())
    }
}

/// Records the deadline handed to every lookup.
struct RecordingPeople {
    deadlines: RefCell<Vec<Option<Instant>>>,
}

impl PersonDirectory for RecordingPeople {
    fn find_person(&self, _id: PersonId, deadline: Option<Instant>) -> LookupResult<Option<Person>> {
        self.deadlines.borrow_mut().push(deadline);
        Ok(None)
    }

    fn search_people(&self, _: &PersonSearch<'_>) -> LookupResult<Vec<Person>> {
        Ok(Vec::new())
    }
}

/// Cancels the shared flag on its first lookup.
struct CancellingPeople {
    cancel: CancelFlag,
    calls: Cell<usize>,
}

impl PersonDirectory for CancellingPeople {
    fn find_person(&self, id: PersonId, _: Option<Instant>) -> LookupResult<Option<Person>> {
        self.calls.set(self.calls.get() + 1);
        self.cancel.cancel();
        let mut person = Person::new("First Member");
        person.id = id;
        Ok(Some(person))
    }

    fn search_people(&self, _: &PersonSearch<'_>) -> LookupResult<Vec<Person>> {
        Ok(Vec::new())
    }
}

/// Board with two positions; the chair seat has two holders.
fn seed_board(conn: &Connection) -> Unit {
    let board = create_unit(conn, Unit::headquarters("Board", "board"));
    let finance = create_unit(
        conn,
        Unit::headquarters("Finance", "finance").with_parent(board.id),
    );
    let chair = create_position(conn, &board, "Chair", "chair");
    let treasurer = create_position(conn, &finance, "Treasurer", "treasurer");

    let jane = insert_member(
        conn,
        "Jane Doe",
        Some("081234567890"),
        Some("jane.doe@example.com"),
        "active",
    );
    let john = insert_member(conn, "John Roe", None, None, "active");
    assign(conn, chair.id, jane, 1_000);
    assign(conn, chair.id, john, 2_000);
    assign(conn, treasurer.id, john, 3_000);
    board
}

fn bare_forest(conn: &Connection) -> Forest {
    let units = SqliteUnitRepository::try_new(conn)
        .unwrap()
        .list_units(&UnitQuery {
            active_only: true,
            ..UnitQuery::default()
        })
        .unwrap();
    assemble_forest(units, 64).unwrap()
}

#[test]
fn enrichment_attaches_positions_holders_and_masked_people() {
    let conn = setup();
    seed_board(&conn);
    let positions = SqlitePositionRepository::try_new(&conn).unwrap();
    let assignments = SqliteAssignmentRepository::try_new(&conn).unwrap();
    let people = SqlitePersonDirectory::new(&conn);
    let pipeline =
        EnrichmentPipeline::new(&positions, &assignments, &people, PrivacyProjector::default());

    let forest = pipeline.enrich(bare_forest(&conn)).unwrap();

    let chair = &forest[0].positions[0];
    assert_eq!(chair.position.title, "Chair");
    assert_eq!(chair.holders.len(), 2);
    let jane = chair.holders[0].person.as_ref().unwrap();
    assert_eq!(jane.full_name, "Jane Doe");
    assert_eq!(jane.contact.masked_phone.as_deref(), Some("0812****7890"));
    assert_eq!(
        jane.contact.masked_email.as_deref(),
        Some("ja******@example.com")
    );
    assert_eq!(jane.contact.photo_url, "/static/img/default-avatar.png");
    let john = chair.holders[1].person.as_ref().unwrap();
    assert_eq!(john.contact.masked_phone, None);

    assert_eq!(
        EnrichmentSummary::of(&forest),
        EnrichmentSummary {
            units: 2,
            positions: 2,
            holders: 3,
            unresolved_holders: 0,
        }
    );
}

#[test]
fn re_enriching_is_idempotent() {
    let conn = setup();
    seed_board(&conn);
    let positions = SqlitePositionRepository::try_new(&conn).unwrap();
    let assignments = SqliteAssignmentRepository::try_new(&conn).unwrap();
    let people = SqlitePersonDirectory::new(&conn);
    let pipeline =
        EnrichmentPipeline::new(&positions, &assignments, &people, PrivacyProjector::default());

    let once = pipeline.enrich(bare_forest(&conn)).unwrap();
    let twice = pipeline.enrich(once.clone()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn failing_person_lookup_only_empties_that_holder() {
    let conn = setup();
    seed_board(&conn);
    let positions = SqlitePositionRepository::try_new(&conn).unwrap();
    let assignments = SqliteAssignmentRepository::try_new(&conn).unwrap();
    let pipeline = EnrichmentPipeline::new(
        &positions,
        &assignments,
        FailingPeople,
        PrivacyProjector::default(),
    );

    let forest = pipeline.enrich(bare_forest(&conn)).unwrap();

    let summary = EnrichmentSummary::of(&forest);
    assert_eq!(summary.units, 2);
    assert_eq!(summary.holders, 3);
    assert_eq!(summary.unresolved_holders, 3);
    assert_eq!(forest[0].children[0].positions[0].holders.len(), 1);
}

#[test]
fn missing_member_renders_holder_without_person() {
    let conn = setup();
    let board = create_unit(&conn, Unit::headquarters("Board", "board"));
    let chair = create_position(&conn, &board, "Chair", "chair");
    let ghost = uuid::Uuid::new_v4();
    assign(&conn, chair.id, ghost, 1_000);

    let positions = SqlitePositionRepository::try_new(&conn).unwrap();
    let assignments = SqliteAssignmentRepository::try_new(&conn).unwrap();
    let people = SqlitePersonDirectory::new(&conn);
    let holders = EnrichmentPipeline::new(&positions, &assignments, &people, PrivacyProjector::default())
        .positions_for(board.id)
        .unwrap()
        .remove(0)
        .holders;

    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].assignment.person_id, ghost);
    assert!(holders[0].person.is_none());
}

#[test]
fn overrunning_lookup_is_discarded_and_spends_only_its_node_budget() {
    let conn = setup();
    seed_board(&conn);
    let positions = SqlitePositionRepository::try_new(&conn).unwrap();
    let assignments = SqliteAssignmentRepository::try_new(&conn).unwrap();
    let people = SlowForName {
        inner: SqlitePersonDirectory::new(&conn),
        slow_name: "Jane Doe",
        delay: Duration::from_millis(60),
        calls: Cell::new(0),
    };
    let pipeline = EnrichmentPipeline::new(
        &positions,
        &assignments,
        &people,
        PrivacyProjector::default(),
    )
    .with_lookup_timeout(Some(Duration::from_millis(20)));

    let forest = pipeline.enrich(bare_forest(&conn)).unwrap();

    // Jane answers after the board budget; John is skipped on the board.
    let chair_holders = &forest[0].positions[0].holders;
    assert!(chair_holders[0].person.is_none());
    assert!(chair_holders[1].person.is_none());
    // Finance starts with a fresh budget and resolves John.
    let finance_holders = &forest[0].children[0].positions[0].holders;
    let john = finance_holders[0].person.as_ref().unwrap();
    assert_eq!(john.full_name, "John Roe");
    assert_eq!(people.calls.get(), 2);
    assert_eq!(EnrichmentSummary::of(&forest).unresolved_holders, 2);
}

#[test]
fn lookups_receive_the_node_deadline() {
    let conn = setup();
    seed_board(&conn);
    let positions = SqlitePositionRepository::try_new(&conn).unwrap();
    let assignments = SqliteAssignmentRepository::try_new(&conn).unwrap();
    let people = RecordingPeople {
        deadlines: RefCell::new(Vec::new()),
    };

    let before = Instant::now();
    EnrichmentPipeline::new(&positions, &assignments, &people, PrivacyProjector::default())
        .with_lookup_timeout(Some(Duration::from_secs(30)))
        .enrich(bare_forest(&conn))
        .unwrap();

    let deadlines = people.deadlines.borrow();
    assert_eq!(deadlines.len(), 3);
    for deadline in deadlines.iter() {
        let deadline = deadline.expect("budgeted lookup carries a deadline");
        assert!(deadline > before);
        assert!(deadline <= Instant::now() + Duration::from_secs(30));
    }
    drop(deadlines);

    people.deadlines.borrow_mut().clear();
    EnrichmentPipeline::new(&positions, &assignments, &people, PrivacyProjector::default())
        .enrich(bare_forest(&conn))
        .unwrap();
    assert!(people.deadlines.borrow().iter().all(Option::is_none));
}

#[test]
fn expired_deadline_times_out_member_lookup() {
    let conn = setup();
    let board = seed_board(&conn);
    let positions = SqlitePositionRepository::try_new(&conn).unwrap();
    let assignments = SqliteAssignmentRepository::try_new(&conn).unwrap();
    let people = SqlitePersonDirectory::new(&conn);
    let member = insert_member(&conn, "Late Member", None, None, "active");

    assert!(people.find_person(member, None).unwrap().is_some());
    let err = people
        .find_person(member, Some(Instant::now()))
        .unwrap_err();
    assert!(matches!(
        err,
        LookupError::TimedOut {
            collaborator: "member_directory"
        }
    ));

    let holders = EnrichmentPipeline::new(&positions, &assignments, &people, PrivacyProjector::default())
        .with_lookup_timeout(Some(Duration::ZERO))
        .positions_for(board.id)
        .unwrap()
        .remove(0)
        .holders;
    assert!(holders.iter().all(|holder| holder.person.is_none()));
}

#[test]
fn cancellation_stops_further_lookups_but_completes_the_walk() {
    let conn = setup();
    seed_board(&conn);
    let positions = SqlitePositionRepository::try_new(&conn).unwrap();
    let assignments = SqliteAssignmentRepository::try_new(&conn).unwrap();
    let cancel = CancelFlag::new();
    let people = CancellingPeople {
        cancel: cancel.clone(),
        calls: Cell::new(0),
    };
    let pipeline = EnrichmentPipeline::new(
        &positions,
        &assignments,
        &people,
        PrivacyProjector::default(),
    )
    .with_cancel_flag(cancel.clone());

    let forest = pipeline.enrich(bare_forest(&conn)).unwrap();

    assert!(cancel.is_cancelled());
    assert_eq!(people.calls.get(), 1);
    let summary = EnrichmentSummary::of(&forest);
    assert_eq!(summary.holders, 3);
    assert_eq!(summary.unresolved_holders, 2);
}
