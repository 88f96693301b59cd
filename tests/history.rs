use rewind::{Cell, Error, Event, FromFn, History, List};
use std::cell::Cell as Flag;
use std::rc::Rc;
use std::sync::mpsc;

#[test]
fn apply_undo_redo() {
    let history = History::new();
    let cell = Cell::new(0);

    history.begin_command("a").unwrap();
    cell.set(1).unwrap();
    history.end_command(false).unwrap();
    assert_eq!(cell.get(), 1);
    assert_eq!(history.len(), 1);
    assert_eq!(history.position(), 1);
    assert!(history.can_undo());
    assert!(!history.can_redo());

    history.undo().unwrap();
    assert_eq!(cell.get(), 0);
    assert_eq!(history.position(), 0);
    assert!(!history.can_undo());
    assert!(history.can_redo());

    history.redo().unwrap();
    assert_eq!(cell.get(), 1);
    assert_eq!(history.position(), 1);
}

#[test]
fn cancel_leaves_no_trace() {
    let history = History::new();
    let items = List::new();
    history.set_saved();

    history.begin_command("a").unwrap();
    items.add(10).unwrap();
    items.add(20).unwrap();
    assert_eq!(items.to_vec(), [10, 20]);
    history.cancel_command().unwrap();

    assert!(items.is_empty());
    assert_eq!(history.len(), 0);
    assert_eq!(history.position(), 0);
    assert!(history.is_saved());
    assert!(!history.is_command_started());
}

#[test]
fn mixed_list_edits_round_trip() {
    let history = History::new();
    let items = List::from_vec(vec![1, 2, 3]);

    history.begin_command("x").unwrap();
    assert_eq!(items.remove_at(0).unwrap(), 1);
    items.insert(1, 9).unwrap();
    history.end_command(false).unwrap();
    assert_eq!(items.to_vec(), [2, 9, 3]);

    history.undo().unwrap();
    assert_eq!(items.to_vec(), [1, 2, 3]);
    history.redo().unwrap();
    assert_eq!(items.to_vec(), [2, 9, 3]);
}

#[test]
fn eviction_keeps_save_point_aligned() {
    let (sender, receiver) = mpsc::channel();
    let history = History::builder().limit(2).connect(sender).build();
    let items = List::new();

    for (id, value) in [("c1", 1), ("c2", 2), ("c3", 3)] {
        history.begin_command(id).unwrap();
        items.add(value).unwrap();
        history.end_command(false).unwrap();
        if id == "c2" {
            history.set_saved();
        }
    }

    assert_eq!(history.len(), 2);
    assert_eq!(history.position(), 2);
    assert!(!history.is_saved());
    assert!(receiver
        .try_iter()
        .any(|event| event == Event::Discarded { id: Some("c1".into()) }));

    history.undo().unwrap();
    assert_eq!(history.position(), 1);
    assert_eq!(items.to_vec(), [1, 2]);
    assert!(history.is_saved());
}

#[test]
fn save_point_poisons_when_its_command_is_evicted() {
    let history = History::builder().limit(1).build();
    let cell = Cell::new(0);

    history.begin_command("c1").unwrap();
    cell.set(1).unwrap();
    history.end_command(false).unwrap();
    history.set_saved();

    history.begin_command("c2").unwrap();
    cell.set(2).unwrap();
    history.end_command(false).unwrap();

    assert_eq!(history.len(), 1);
    assert!(!history.is_saved());
    history.undo().unwrap();
    assert!(!history.is_saved());
    history.redo().unwrap();
    assert!(!history.is_saved());
}

#[test]
fn mergeable_commands_with_equal_identifiers_collapse() {
    let history = History::new();
    let cell = Cell::new(0);

    history.begin_command("edit").unwrap();
    cell.set(1).unwrap();
    history.end_command(true).unwrap();
    history.begin_command("edit").unwrap();
    cell.set(2).unwrap();
    history.end_command(true).unwrap();

    assert_eq!(history.len(), 1);
    assert_eq!(history.position(), 1);
    history.undo().unwrap();
    assert_eq!(cell.get(), 0);
    history.redo().unwrap();
    assert_eq!(cell.get(), 2);
}

#[test]
fn mergeable_commands_with_distinct_identifiers_stay_apart() {
    let history = History::new();
    let cell = Cell::new(0);

    history.begin_command("first").unwrap();
    cell.set(1).unwrap();
    history.end_command(true).unwrap();
    history.begin_command("second").unwrap();
    cell.set(2).unwrap();
    history.end_command(true).unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(
        history.command_ids(),
        [Some("first".to_string()), Some("second".to_string())]
    );
    assert_eq!(history.command_id_at(1), Some("second".to_string()));
}

#[test]
fn suspended_writes_survive_undo() {
    let history = History::new();
    let cell = Cell::new(0);

    history.begin_command("a").unwrap();
    cell.set(1).unwrap();
    history.suspend_command();
    assert!(history.is_command_suspended());
    cell.set(2).unwrap();
    history.resume_command();
    assert!(!history.is_command_suspended());
    cell.set(3).unwrap();
    history.end_command(false).unwrap();

    assert_eq!(cell.get(), 3);
    history.undo().unwrap();
    assert_eq!(cell.get(), 2);
    history.redo().unwrap();
    assert_eq!(cell.get(), 3);
}

#[test]
fn suspended_actions_are_not_recorded() {
    let history = History::new();
    let items = List::new();

    history.begin_command("a").unwrap();
    items.add(1).unwrap();
    history.suspend_command();
    items.add(2).unwrap();
    assert!(rewind::last_action().is_none());
    history.resume_command();
    history.end_command(false).unwrap();

    assert_eq!(items.to_vec(), [1, 2]);
    history.undo().unwrap();
    assert_eq!(items.to_vec(), [2]);
}

#[test]
fn empty_commands_are_elided() {
    let (sender, receiver) = mpsc::channel();
    let history = History::builder().connect(sender).build();

    history.begin_command("noop").unwrap();
    history.end_command(false).unwrap();

    assert_eq!(history.len(), 0);
    assert_eq!(history.position(), 0);
    let events: Vec<_> = receiver.try_iter().collect();
    assert_eq!(
        events,
        [
            Event::Started {
                id: Some("noop".into())
            },
            Event::Ended {
                id: Some("noop".into())
            },
            Event::Executed {
                id: Some("noop".into())
            },
        ]
    );
}

#[test]
fn lifecycle_errors() {
    let history = History::new();
    assert!(matches!(history.end_command(false), Err(Error::NoCommand)));
    assert!(matches!(history.cancel_command(), Err(Error::NoCommand)));
    assert!(matches!(history.undo(), Err(Error::NothingToUndo)));
    assert!(matches!(history.redo(), Err(Error::NothingToRedo)));

    history.begin_command("a").unwrap();
    assert!(matches!(history.begin_command("b"), Err(Error::Busy)));
    assert!(matches!(history.undo(), Err(Error::Busy)));
    assert!(matches!(history.redo(), Err(Error::Busy)));
    assert!(matches!(history.set_position(0), Err(Error::Busy)));
    assert!(matches!(history.clear(), Err(Error::Busy)));

    let other = History::new();
    assert!(matches!(other.begin_command("c"), Err(Error::Busy)));

    history.cancel_command().unwrap();
    assert!(history.begin_command("b").is_ok());
    history.cancel_command().unwrap();
}

#[test]
fn suspend_resume_outside_a_command_do_nothing() {
    let history = History::new();
    history.suspend_command();
    assert!(!history.is_command_suspended());
    history.resume_command();
    history.resume_command();

    let cell = Cell::new(0);
    history.begin_command("a").unwrap();
    cell.set(1).unwrap();
    history.end_command(false).unwrap();
    history.undo().unwrap();
    assert_eq!(cell.get(), 0);
}

#[test]
fn events_follow_the_lifecycle() {
    let (sender, receiver) = mpsc::channel();
    let history = History::builder().connect(sender).build();
    let cell = Cell::new(0);
    let id = || Some("a".to_string());

    history.begin_command("a").unwrap();
    cell.set(1).unwrap();
    history.end_command(false).unwrap();
    history.undo().unwrap();
    history.redo().unwrap();

    let events: Vec<_> = receiver.try_iter().collect();
    assert_eq!(
        events,
        [
            Event::Started { id: id() },
            Event::Ended { id: id() },
            Event::Executed { id: id() },
            Event::RolledBack { id: id() },
            Event::Executed { id: id() },
        ]
    );
}

#[test]
fn observers_may_add_actions_while_the_command_ends() {
    let history = History::new();
    let edited = Cell::new(0);
    let stamp = Cell::new(0);

    let late = stamp.clone();
    history.connect(move |event: Event| {
        if matches!(event, Event::Ended { .. }) {
            late.set(42).unwrap();
        }
    });

    history.begin_command("edit").unwrap();
    edited.set(1).unwrap();
    history.end_command(false).unwrap();
    assert_eq!(stamp.get(), 42);
    assert_eq!(history.len(), 1);

    // The late action joined the command, so it reverts with it.
    history.undo().unwrap();
    assert_eq!(edited.get(), 0);
    assert_eq!(stamp.get(), 0);
}

#[test]
fn observers_cannot_reenter_traversal() {
    let history = History::new();
    let cell = Cell::new(0);
    let reentry = Rc::new(Flag::new(false));

    history.begin_command("a").unwrap();
    cell.set(1).unwrap();
    history.end_command(false).unwrap();

    let inner = history.clone();
    let seen = reentry.clone();
    history.connect(move |event: Event| {
        if matches!(event, Event::RolledBack { .. }) {
            seen.set(matches!(inner.undo(), Err(Error::Busy)));
        }
    });
    history.undo().unwrap();
    assert!(reentry.get());
}

#[test]
fn undoing_flag_is_visible_to_observers() {
    let history = History::new();
    let cell = Cell::new(0);
    let observed = Rc::new(Flag::new(false));

    history.begin_command("a").unwrap();
    cell.set(1).unwrap();
    history.end_command(false).unwrap();

    let inner = history.clone();
    let seen = observed.clone();
    history.connect(move |event: Event| {
        if matches!(event, Event::RolledBack { .. }) {
            seen.set(inner.is_undoing());
        }
    });
    assert!(!history.is_undoing());
    history.undo().unwrap();
    assert!(observed.get());
    assert!(!history.is_undoing());
}

#[test]
fn set_position_traverses_in_both_directions() {
    let history = History::new();
    let items = List::new();

    for value in 1..=3 {
        history.begin_command(format!("c{value}")).unwrap();
        items.add(value).unwrap();
        history.end_command(false).unwrap();
    }
    assert_eq!(items.to_vec(), [1, 2, 3]);

    history.set_position(0).unwrap();
    assert_eq!(history.position(), 0);
    assert!(items.is_empty());

    history.set_position(2).unwrap();
    assert_eq!(history.position(), 2);
    assert_eq!(items.to_vec(), [1, 2]);

    // Targets beyond the top clamp to the length.
    history.set_position(9).unwrap();
    assert_eq!(history.position(), 3);
    assert_eq!(items.to_vec(), [1, 2, 3]);
}

#[test]
fn new_commands_discard_the_redo_tail() {
    let history = History::new();
    let cell = Cell::new(0);

    for (id, value) in [("c1", 1), ("c2", 2)] {
        history.begin_command(id).unwrap();
        cell.set(value).unwrap();
        history.end_command(false).unwrap();
    }
    history.undo().unwrap();
    assert_eq!(cell.get(), 1);

    history.begin_command("c3").unwrap();
    cell.set(9).unwrap();
    history.end_command(false).unwrap();

    assert_eq!(history.len(), 2);
    assert!(!history.can_redo());
    assert_eq!(
        history.command_ids(),
        [Some("c1".to_string()), Some("c3".to_string())]
    );
}

#[test]
fn shrinking_the_limit_drops_the_oldest_commands() {
    let history = History::new();
    let items = List::new();

    for value in 1..=4 {
        history.begin_command(format!("c{value}")).unwrap();
        items.add(value).unwrap();
        history.end_command(false).unwrap();
    }
    history.set_saved();
    history.set_limit(2);

    assert_eq!(history.limit(), 2);
    assert_eq!(history.len(), 2);
    assert_eq!(history.position(), 2);
    assert!(history.is_saved());
    assert_eq!(
        history.command_ids(),
        [Some("c3".to_string()), Some("c4".to_string())]
    );

    history.undo().unwrap();
    history.undo().unwrap();
    assert!(matches!(history.undo(), Err(Error::NothingToUndo)));
    assert_eq!(items.to_vec(), [1, 2]);
}

#[test]
fn shrinking_the_limit_poisons_an_evicted_save_point() {
    let history = History::new();
    let cell = Cell::new(0);

    history.begin_command("c1").unwrap();
    cell.set(1).unwrap();
    history.end_command(false).unwrap();
    history.set_saved();

    for (id, value) in [("c2", 2), ("c3", 3)] {
        history.begin_command(id).unwrap();
        cell.set(value).unwrap();
        history.end_command(false).unwrap();
    }
    history.set_limit(2);

    assert!(!history.is_saved());
    history.set_position(0).unwrap();
    assert!(!history.is_saved());
    assert_eq!(cell.get(), 1);
}

#[test]
fn clear_forgets_the_commands_without_reverting_them() {
    let history = History::new();
    let items = List::new();

    for value in 1..=2 {
        history.begin_command(format!("c{value}")).unwrap();
        items.add(value).unwrap();
        history.end_command(false).unwrap();
    }
    history.clear().unwrap();

    assert!(history.is_empty());
    assert_eq!(history.position(), 0);
    assert!(history.is_saved());
    assert!(!history.can_undo());
    assert_eq!(items.to_vec(), [1, 2]);
}

#[test]
fn actions_outside_a_command_fire_and_forget() {
    let counter = Rc::new(Flag::new(0));
    assert!(rewind::last_action().is_none());

    let bump = counter.clone();
    let unbump = counter.clone();
    rewind::add_action(FromFn::new(
        move || {
            bump.set(bump.get() + 1);
            Ok(())
        },
        move || {
            unbump.set(unbump.get() - 1);
            Ok(())
        },
    ))
    .unwrap();
    assert_eq!(counter.get(), 1);
    assert!(rewind::last_action().is_none());
}

#[test]
fn current_command_queries() {
    let history = History::new();
    let cell = Cell::new(0);

    assert_eq!(history.current_command_id(), None);
    history.begin_command("rename").unwrap();
    assert!(history.is_command_started());
    assert_eq!(history.current_command_id(), Some("rename".to_string()));
    cell.set(1).unwrap();
    assert!(rewind::last_action().is_some());
    history.end_command(false).unwrap();
    assert_eq!(history.current_command_id(), None);
    assert!(!history.is_command_started());
}
