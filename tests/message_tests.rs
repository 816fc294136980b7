//! Message trigger tests: a trigger watching the head of a producer's queue.

use std::rc::Rc;

use sim_statecharts::core::{RunEnvironment, SimConfig};
use sim_statecharts::messages::{MessageChecker, MessageQueue};
use sim_statecharts::schedule::{Schedule, Scheduler};
use sim_statecharts::triggers::Trigger;

fn setup() -> (Rc<Schedule>, RunEnvironment) {
    RunEnvironment::init(SimConfig::new(11))
}

#[test]
fn test_message_trigger_by_type() {
    let (schedule, env) = setup();
    let queue = MessageQueue::new();
    let trigger = Trigger::message(&env, &queue, MessageChecker::by_type::<String>()).unwrap();
    trigger.initialize();

    assert!(!trigger.is_valid());
    assert!(!trigger.is_triggered());

    queue.push(String::from("Hello"));
    assert!(trigger.is_valid());
    assert!(!trigger.is_triggered());

    schedule.execute();
    assert_eq!(schedule.tick_count(), 1.0);
    assert!(trigger.is_valid());
    assert!(trigger.is_triggered());
}

#[test]
fn test_message_trigger_equals_with_custom_interval() {
    let (schedule, env) = setup();
    schedule.schedule_one_time(1.0, Box::new(|| ()));
    schedule.execute();
    let queue = MessageQueue::new();
    assert!(queue.poll().is_none());

    let trigger =
        Trigger::message_every(&env, &queue, MessageChecker::equals(String::from("hello")), 0.5).unwrap();
    trigger.initialize();
    assert_eq!(trigger.next_check_time(), Some(1.5));

    queue.push(String::from("hello"));
    assert!(trigger.is_valid());
    assert!(!trigger.is_triggered());

    schedule.execute();
    assert_eq!(schedule.tick_count(), 1.5);
    assert!(trigger.is_valid());
    assert!(trigger.is_triggered());
}

#[test]
fn test_message_trigger_ignores_other_values() {
    let (schedule, env) = setup();
    let queue = MessageQueue::new();
    let trigger = Trigger::message(&env, &queue, MessageChecker::equals(3_u32)).unwrap();
    trigger.initialize();

    queue.push(4_u32);
    assert!(!trigger.is_valid());

    schedule.execute();
    assert!(!trigger.is_triggered());
    assert_eq!(trigger.next_check_time(), Some(2.0));

    // Only the head counts.
    queue.push(3_u32);
    assert!(!trigger.is_valid());
    assert_eq!(queue.poll_as::<u32>(), Some(4));
    assert!(trigger.is_valid());

    schedule.execute();
    assert_eq!(schedule.tick_count(), 2.0);
    assert!(trigger.is_triggered());
}

#[test]
fn test_message_trigger_never_dequeues() {
    let (schedule, env) = setup();
    let queue = MessageQueue::new();
    queue.push(String::from("ping"));
    let trigger = Trigger::message(&env, &queue, MessageChecker::by_type::<String>()).unwrap();
    trigger.initialize();

    schedule.execute();
    assert!(trigger.is_triggered());
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.poll_as::<String>().as_deref(), Some("ping"));
}

#[test]
fn test_message_trigger_type_mismatch() {
    let (schedule, env) = setup();
    let queue = MessageQueue::new();
    queue.push(7_i64);
    let trigger = Trigger::message(&env, &queue, MessageChecker::by_type::<String>()).unwrap();
    trigger.initialize();

    assert!(!trigger.is_valid());
    schedule.execute();
    assert!(!trigger.is_triggered());
}

#[test]
fn test_message_trigger_outlived_by_queue_owner() {
    let (schedule, env) = setup();
    let queue = MessageQueue::new();
    queue.push(String::from("late"));
    let trigger = Trigger::message(&env, &queue, MessageChecker::by_type::<String>()).unwrap();
    trigger.initialize();
    assert!(trigger.is_valid());

    drop(queue);
    assert!(!trigger.is_valid());

    schedule.execute();
    assert!(!trigger.is_triggered());
    // Still polling; a dropped queue reads as empty, not as an error.
    assert_eq!(trigger.next_check_time(), Some(2.0));
}

#[test]
fn test_two_triggers_share_one_queue() {
    let (schedule, env) = setup();
    let queue = MessageQueue::new();
    let strings = Trigger::message(&env, &queue, MessageChecker::by_type::<String>()).unwrap();
    let numbers = Trigger::message(&env, &queue, MessageChecker::by_type::<i32>()).unwrap();
    strings.initialize();
    numbers.initialize();

    queue.push(5_i32);
    schedule.execute();

    assert!(!strings.is_triggered());
    assert!(numbers.is_triggered());
}
