//! End-to-end termination and dispatch scenarios.

use meshsim_core::{
    protocol_cell, EventHandler, HandlerError, Payload, Protocol, PrototypeRegistry, SimContext,
};
use meshsim_engine::{Engine, EngineConfig, EngineError, FinishReason};
use meshsim_types::{FailState, NodeId, ProtocolSlot, VirtualTime};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

const SLOT: ProtocolSlot = ProtocolSlot(0);

type Trace = Rc<RefCell<Vec<(VirtualTime, NodeId, Option<String>)>>>;

/// Records every dispatch it receives.
struct Recorder {
    trace: Trace,
}

impl Protocol for Recorder {
    fn as_event_handler(&mut self) -> Option<&mut dyn EventHandler> {
        Some(self)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl EventHandler for Recorder {
    fn process_event(
        &mut self,
        ctx: &mut SimContext<'_>,
        node: NodeId,
        _slot: ProtocolSlot,
        payload: Option<Payload>,
    ) -> Result<(), HandlerError> {
        let text = payload
            .and_then(|p| p.downcast::<String>().ok())
            .map(|boxed| *boxed);
        self.trace.borrow_mut().push((ctx.now(), node, text));
        Ok(())
    }
}

fn recorder_engine(nodes: usize, config: EngineConfig) -> (Engine, Trace) {
    let trace: Trace = Rc::default();
    let mut prototypes = PrototypeRegistry::new(1);
    let shared = Rc::clone(&trace);
    prototypes
        .register_fn(0, move || {
            protocol_cell(Recorder {
                trace: Rc::clone(&shared),
            })
        })
        .unwrap();
    let mut engine = Engine::new(config, prototypes);
    engine.populate(nodes).unwrap();
    (engine, trace)
}

fn text(s: &str) -> Option<Payload> {
    Some(Box::new(s.to_string()))
}

#[test]
fn test_empty_queue_finishes_at_time_zero() {
    let (mut engine, trace) = recorder_engine(3, EngineConfig::default());

    let reason = engine.run_to_completion().unwrap();

    assert_eq!(reason, FinishReason::EmptyQueue);
    assert_eq!(engine.now(), 0);
    assert!(trace.borrow().is_empty());
}

#[test]
fn test_single_event_dispatches_once_with_payload() {
    let (mut engine, trace) = recorder_engine(1, EngineConfig::default());
    engine.schedule_at(100, NodeId(0), SLOT, text("x")).unwrap();

    let reason = engine.run_to_completion().unwrap();

    assert_eq!(reason, FinishReason::EmptyQueue);
    assert_eq!(engine.now(), 100);
    assert_eq!(
        *trace.borrow(),
        vec![(100, NodeId(0), Some("x".to_string()))]
    );
    assert_eq!(engine.stats().events_dispatched, 1);
}

/// Each node schedules itself a timeout on its first event; all ten
/// timeouts land at the same time and dispatch in node-creation order.
#[test]
fn test_self_timeouts_fire_in_creation_order() {
    struct SelfTimeout {
        trace: Trace,
    }

    impl Protocol for SelfTimeout {
        fn as_event_handler(&mut self) -> Option<&mut dyn EventHandler> {
            Some(self)
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    impl EventHandler for SelfTimeout {
        fn process_event(
            &mut self,
            ctx: &mut SimContext<'_>,
            node: NodeId,
            slot: ProtocolSlot,
            payload: Option<Payload>,
        ) -> Result<(), HandlerError> {
            self.trace.borrow_mut().push((ctx.now(), node, None));
            if payload.is_some() {
                // First (kick-off) event: arm the self-alarm.
                ctx.schedule_after(5, node, slot, None)?;
            }
            Ok(())
        }
    }

    let trace: Trace = Rc::default();
    let mut prototypes = PrototypeRegistry::new(1);
    let shared = Rc::clone(&trace);
    prototypes
        .register_fn(0, move || {
            protocol_cell(SelfTimeout {
                trace: Rc::clone(&shared),
            })
        })
        .unwrap();
    let mut engine = Engine::new(EngineConfig::default(), prototypes);
    engine.populate(10).unwrap();
    for index in 0..10 {
        let id = engine.network().get(index).unwrap().id();
        engine.schedule_at(0, id, SLOT, text("start")).unwrap();
    }

    engine.run_to_completion().unwrap();

    let trace = trace.borrow();
    let timeouts: Vec<NodeId> = trace
        .iter()
        .filter(|(time, _, _)| *time == 5)
        .map(|(_, node, _)| *node)
        .collect();
    assert_eq!(timeouts, (0..10).map(NodeId).collect::<Vec<_>>());
    assert_eq!(engine.now(), 5);
}

/// A control that requests a stop on its second invocation ends the run
/// after two rounds, with all events due at or before the second boundary
/// already processed.
#[test]
fn test_control_stop_after_second_round() {
    use meshsim_core::{Control, ControlContext};

    struct Ticker {
        trace: Trace,
    }

    impl Protocol for Ticker {
        fn as_event_handler(&mut self) -> Option<&mut dyn EventHandler> {
            Some(self)
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    impl EventHandler for Ticker {
        fn process_event(
            &mut self,
            ctx: &mut SimContext<'_>,
            node: NodeId,
            slot: ProtocolSlot,
            _payload: Option<Payload>,
        ) -> Result<(), HandlerError> {
            self.trace.borrow_mut().push((ctx.now(), node, None));
            ctx.schedule_after(4, node, slot, None)?;
            Ok(())
        }
    }

    struct StopOnSecond {
        calls: Rc<RefCell<u32>>,
    }

    impl Control for StopOnSecond {
        fn execute(&mut self, _ctx: &mut ControlContext<'_>) -> Result<bool, HandlerError> {
            *self.calls.borrow_mut() += 1;
            Ok(*self.calls.borrow() >= 2)
        }
    }

    let trace: Trace = Rc::default();
    let mut prototypes = PrototypeRegistry::new(1);
    let shared = Rc::clone(&trace);
    prototypes
        .register_fn(0, move || {
            protocol_cell(Ticker {
                trace: Rc::clone(&shared),
            })
        })
        .unwrap();
    let mut engine = Engine::new(EngineConfig::default(), prototypes);
    engine.populate(1).unwrap();
    let calls = Rc::new(RefCell::new(0));
    engine
        .register_control("stopper", Box::new(StopOnSecond { calls: Rc::clone(&calls) }), 10, 0)
        .unwrap();
    engine.schedule_at(0, NodeId(0), SLOT, None).unwrap();

    let reason = engine.run_to_completion().unwrap();

    assert_eq!(reason, FinishReason::ControlRequested);
    assert_eq!(*calls.borrow(), 2);
    assert_eq!(engine.now(), 20);
    // Every event due at or before the second boundary ran; nothing after.
    let times: Vec<VirtualTime> = trace.borrow().iter().map(|(t, _, _)| *t).collect();
    assert_eq!(times, vec![0, 4, 8, 12, 16, 20]);
}

#[test]
fn test_same_time_events_dispatch_in_scheduling_order() {
    let (mut engine, trace) = recorder_engine(2, EngineConfig::default());
    engine.schedule_at(50, NodeId(1), SLOT, text("e1")).unwrap();
    engine.schedule_at(50, NodeId(0), SLOT, text("e2")).unwrap();

    engine.run_to_completion().unwrap();

    assert_eq!(
        *trace.borrow(),
        vec![
            (50, NodeId(1), Some("e1".to_string())),
            (50, NodeId(0), Some("e2".to_string())),
        ]
    );
}

#[test]
fn test_cancelled_event_never_dispatches() {
    let (mut engine, trace) = recorder_engine(1, EngineConfig::default());
    let _keep = engine.schedule_at(10, NodeId(0), SLOT, text("keep")).unwrap();
    let doomed = engine.schedule_at(10, NodeId(0), SLOT, text("drop")).unwrap();

    assert!(engine.cancel(doomed));
    assert!(!engine.cancel(doomed));

    engine.run_to_completion().unwrap();
    assert_eq!(
        *trace.borrow(),
        vec![(10, NodeId(0), Some("keep".to_string()))]
    );
}

#[test]
fn test_scheduling_into_the_past_fails_after_the_clock_advanced() {
    use meshsim_core::ScheduleError;

    let (mut engine, _trace) = recorder_engine(1, EngineConfig::default());
    engine.schedule_at(100, NodeId(0), SLOT, None).unwrap();
    engine.run_to_completion().unwrap();
    assert_eq!(engine.now(), 100);

    assert!(matches!(
        engine.schedule_at(50, NodeId(0), SLOT, None),
        Err(ScheduleError::InvalidTime {
            requested: 50,
            now: 100
        })
    ));
}

#[test]
fn test_end_time_cuts_the_run_short() {
    let (mut engine, trace) = recorder_engine(1, EngineConfig {
        end_time: Some(50),
        ..EngineConfig::default()
    });
    engine.schedule_at(100, NodeId(0), SLOT, text("late")).unwrap();

    let reason = engine.run_to_completion().unwrap();

    assert_eq!(reason, FinishReason::EndTime);
    assert!(trace.borrow().is_empty());
    assert!(engine.now() <= 50);
    assert_eq!(engine.pending_events(), 1);
}

#[test]
fn test_event_for_a_protocol_without_the_capability_is_fatal() {
    struct Mute;

    impl Protocol for Mute {
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    let mut prototypes = PrototypeRegistry::new(1);
    prototypes.register_fn(0, || protocol_cell(Mute)).unwrap();
    let mut engine = Engine::new(EngineConfig::default(), prototypes);
    engine.populate(1).unwrap();
    engine.schedule_at(10, NodeId(0), SLOT, None).unwrap();

    assert!(matches!(
        engine.run_to_completion(),
        Err(EngineError::CapabilityNotSupported {
            time: 10,
            node: NodeId(0),
            ..
        })
    ));
}

#[test]
fn test_handler_errors_carry_dispatch_context() {
    struct Faulty;

    impl Protocol for Faulty {
        fn as_event_handler(&mut self) -> Option<&mut dyn EventHandler> {
            Some(self)
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    impl EventHandler for Faulty {
        fn process_event(
            &mut self,
            _ctx: &mut SimContext<'_>,
            _node: NodeId,
            _slot: ProtocolSlot,
            _payload: Option<Payload>,
        ) -> Result<(), HandlerError> {
            Err("boom".into())
        }
    }

    let mut prototypes = PrototypeRegistry::new(1);
    prototypes.register_fn(0, || protocol_cell(Faulty)).unwrap();
    let mut engine = Engine::new(EngineConfig::default(), prototypes);
    engine.populate(1).unwrap();
    engine.schedule_at(30, NodeId(0), SLOT, None).unwrap();

    let err = engine.run_to_completion().unwrap_err();
    match &err {
        EngineError::Handler { time, node, .. } => {
            assert_eq!(*time, 30);
            assert_eq!(*node, NodeId(0));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("boom"));
}

/// Events addressed to a suspended node are dropped; once a control
/// brings the node back up, later events reach it again.
#[test]
fn test_down_node_drops_events_until_restored() {
    use meshsim_core::{Control, ControlContext};

    struct Revive {
        id: NodeId,
    }

    impl Control for Revive {
        fn execute(&mut self, ctx: &mut ControlContext<'_>) -> Result<bool, HandlerError> {
            ctx.set_fail_state(self.id, FailState::Up);
            Ok(false)
        }
    }

    let (mut engine, trace) = recorder_engine(1, EngineConfig::default());
    engine
        .network_mut()
        .by_id_mut(NodeId(0))
        .unwrap()
        .set_fail_state(FailState::Down);
    engine
        .register_control("revive", Box::new(Revive { id: NodeId(0) }), 15, 0)
        .unwrap();
    engine.schedule_at(10, NodeId(0), SLOT, text("lost")).unwrap();
    engine.schedule_at(20, NodeId(0), SLOT, text("heard")).unwrap();

    engine.run_to_completion().unwrap();

    assert_eq!(
        *trace.borrow(),
        vec![(20, NodeId(0), Some("heard".to_string()))]
    );
    assert_eq!(engine.stats().events_dropped_down_node, 1);
}
