//! Front-desk dispatch walkthroughs against a fully wired queue.

use queue_engine::{
    DepartmentId, FrontDeskQueue, Priority, QueueConfig, QueueError, Token, TokenRequest,
    TokenStatus,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn queue() -> FrontDeskQueue {
    FrontDeskQueue::new(QueueConfig::default().with_token_floor(101)).unwrap()
}

fn issue(queue: &FrontDeskQueue, name: &str, dept: &str, priority: Priority) -> Token {
    queue
        .create_token(TokenRequest::new(name, dept, priority))
        .unwrap()
}

fn lab() -> DepartmentId {
    DepartmentId::new("lab")
}

// ---------------------------------------------------------------------------
// Walkthroughs
// ---------------------------------------------------------------------------

#[test]
fn emergency_is_called_before_earlier_tokens() {
    let queue = queue();
    let a = issue(&queue, "A", "lab", Priority::Normal);
    let b = issue(&queue, "B", "lab", Priority::Urgent);
    let c = issue(&queue, "C", "lab", Priority::Emergency);
    assert_eq!(
        (a.token_number, b.token_number, c.token_number),
        (101, 102, 103)
    );

    let called = queue.call_next_token(&lab(), 10).unwrap();
    assert_eq!(called.id, c.id);
    assert_eq!(called.status, TokenStatus::Called);
    assert_eq!(called.counter, Some(10));
}

#[test]
fn urgent_follows_emergency_on_the_same_counter() {
    let queue = queue();
    let a = issue(&queue, "A", "lab", Priority::Normal);
    let b = issue(&queue, "B", "lab", Priority::Urgent);
    let c = issue(&queue, "C", "lab", Priority::Emergency);

    queue.call_next_token(&lab(), 10).unwrap();
    let called = queue.call_next_token(&lab(), 10).unwrap();

    assert_eq!(called.id, b.id);
    assert_eq!(called.status, TokenStatus::Called);
    assert_eq!(called.counter, Some(10));
    // C was at counter 10 and has been completed to free it
    assert_eq!(queue.get_token(&c.id).unwrap().status, TokenStatus::Completed);
    assert_eq!(queue.get_token(&a.id).unwrap().status, TokenStatus::Waiting);
}

#[test]
fn empty_department_mutates_nothing() {
    let queue = queue();
    issue(&queue, "A", "lab", Priority::Normal);
    issue(&queue, "B", "lab", Priority::Urgent);
    let before = queue.store().snapshot();

    let result = queue.call_next_token(&DepartmentId::new("pharmacy"), 8);

    assert!(matches!(result, Err(QueueError::NoWaitingToken(ref d)) if d.as_str() == "pharmacy"));
    assert_eq!(queue.store().snapshot(), before);
}

#[test]
fn same_tier_is_first_come_first_served() {
    let queue = FrontDeskQueue::new(QueueConfig::default().with_token_floor(104)).unwrap();
    let d = issue(&queue, "D", "lab", Priority::Normal);
    let e = issue(&queue, "E", "lab", Priority::Normal);

    assert_eq!(queue.call_next_token(&lab(), 10).unwrap().id, d.id);
    assert_eq!(queue.call_next_token(&lab(), 11).unwrap().id, e.id);
}

#[test]
fn called_token_cannot_return_to_waiting() {
    let queue = queue();
    let token = issue(&queue, "A", "lab", Priority::Normal);
    queue.call_next_token(&lab(), 10).unwrap();

    let result = queue.transition(&token.id, TokenStatus::Waiting, None);

    assert!(matches!(result, Err(QueueError::IllegalTransition { .. })));
    assert_eq!(queue.get_token(&token.id).unwrap().status, TokenStatus::Called);
}

#[test]
fn full_shift_in_one_queue() {
    let queue = queue();

    // Lab: A normal, B urgent, C emergency
    let a = issue(&queue, "A", "lab", Priority::Normal);
    let b = issue(&queue, "B", "lab", Priority::Urgent);
    let c = issue(&queue, "C", "lab", Priority::Emergency);

    assert_eq!(queue.call_next_token(&lab(), 10).unwrap().id, c.id);
    assert_eq!(queue.call_next_token(&lab(), 10).unwrap().id, b.id);

    // Pharmacy is empty
    assert!(matches!(
        queue.call_next_token(&DepartmentId::new("pharmacy"), 8),
        Err(QueueError::NoWaitingToken(_))
    ));

    // General: D and E normal
    let general = DepartmentId::new("general");
    let d = issue(&queue, "D", "general", Priority::Normal);
    let e = issue(&queue, "E", "general", Priority::Normal);
    assert_eq!((d.token_number, e.token_number), (104, 105));
    assert_eq!(queue.call_next_token(&general, 1).unwrap().id, d.id);
    assert_eq!(queue.call_next_token(&general, 2).unwrap().id, e.id);

    // A is still the only one waiting in the lab
    let up_next = queue.up_next(Some(&lab()));
    assert_eq!(up_next.len(), 1);
    assert_eq!(up_next[0].id, a.id);

    let serving: Vec<_> = queue
        .currently_serving(None)
        .iter()
        .map(|t| t.token_number)
        .collect();
    assert_eq!(serving, vec![102, 104, 105]);
}

#[test]
fn no_show_frees_the_counter() {
    let queue = queue();
    let a = issue(&queue, "A", "lab", Priority::Normal);
    let b = issue(&queue, "B", "lab", Priority::Normal);

    queue.call_next_token(&lab(), 10).unwrap();
    queue.mark_no_show(&a.id).unwrap();
    assert!(queue.store().occupant(&lab(), 10).is_none());

    let called = queue.call_next_token(&lab(), 10).unwrap();
    assert_eq!(called.id, b.id);
    assert_eq!(queue.summary(&lab()).no_show, 1);
}

#[test]
fn exhausted_department_stays_exhausted() {
    let queue = queue();
    issue(&queue, "A", "lab", Priority::Normal);
    queue.call_next_token(&lab(), 10).unwrap();

    for _ in 0..3 {
        assert!(matches!(
            queue.call_next_token(&lab(), 11),
            Err(QueueError::NoWaitingToken(_))
        ));
    }
    assert_eq!(queue.summary(&lab()).called, 1);
}

#[test]
fn invalid_intake_is_rejected() {
    let queue = queue();
    let blank = queue.create_token(TokenRequest::new("  ", "lab", Priority::Normal));
    let unknown = queue.create_token(TokenRequest::new("A", "cardiology", Priority::Normal));

    assert!(blank.unwrap_err().is_advisory());
    assert!(matches!(unknown, Err(QueueError::Validation(_))));
    assert_eq!(issue(&queue, "A", "lab", Priority::Normal).token_number, 101);
}
