//! Generic agent state-machine engine.
//!
//! A machine is a plain enum key (the current state) plus a lookup table
//! mapping each key to its handler — one registration per state, no
//! inheritance chains. Handlers return `Some(next)` to request a transition;
//! `enter` may itself request an immediate follow-up transition, which the
//! driver applies as a bounded chain (`exit` old, `enter` new, repeat).
//!
//! The engine owns no agent data: callers pass the current key and a context
//! of whatever the handlers need. The occupant lifecycle is the first user
//! (`occupant_states`), but nothing here is occupant-specific.

use bevy::prelude::*;

/// Per-state behavior. All hooks default to "do nothing, stay put".
///
/// `on_destination_reached` is a distinct hook from `update`: the movement
/// collaborator fires it exactly once per completed move, and only the
/// active state's handler sees it.
pub trait AgentState<K, C>: Send + Sync {
    fn enter(&self, _ctx: &mut C) -> Option<K> {
        None
    }

    fn update(&self, _ctx: &mut C, _dt: f32) -> Option<K> {
        None
    }

    fn exit(&self, _ctx: &mut C) {}

    fn on_destination_reached(&self, _ctx: &mut C) -> Option<K> {
        None
    }
}

/// Maps a state key to its registered handler.
pub trait StateLookup<K, C> {
    fn handler(&self, key: K) -> &dyn AgentState<K, C>;
}

/// Upper bound on enter-chained transitions in a single step. A chain this
/// deep means two states hand off to each other forever; the driver stops
/// and logs rather than spinning.
const MAX_TRANSITION_CHAIN: u32 = 8;

/// Exits the current state, enters `next`, and follows any transitions the
/// new state's `enter` requests.
pub fn force_transition<K, C>(
    table: &impl StateLookup<K, C>,
    current: &mut K,
    next: K,
    ctx: &mut C,
) where
    K: Copy + PartialEq + std::fmt::Debug,
{
    let mut next = next;
    let mut hops = 0;
    loop {
        if next == *current {
            return;
        }
        table.handler(*current).exit(ctx);
        *current = next;
        match table.handler(*current).enter(ctx) {
            Some(chained) => {
                hops += 1;
                if hops >= MAX_TRANSITION_CHAIN {
                    warn!(
                        "transition chain exceeded {} hops at {:?}; stopping",
                        MAX_TRANSITION_CHAIN, current
                    );
                    return;
                }
                next = chained;
            }
            None => return,
        }
    }
}

/// Runs the active state's `update`, applying a requested transition.
pub fn run_update<K, C>(table: &impl StateLookup<K, C>, current: &mut K, ctx: &mut C, dt: f32)
where
    K: Copy + PartialEq + std::fmt::Debug,
{
    if let Some(next) = table.handler(*current).update(ctx, dt) {
        force_transition(table, current, next, ctx);
    }
}

/// Delivers a destination-reached signal to the active state's handler,
/// applying a requested transition.
pub fn deliver_destination_reached<K, C>(table: &impl StateLookup<K, C>, current: &mut K, ctx: &mut C)
where
    K: Copy + PartialEq + std::fmt::Debug,
{
    if let Some(next) = table.handler(*current).on_destination_reached(ctx) {
        force_transition(table, current, next, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Red,
        Green,
        // Transit state whose `enter` immediately chains onward.
        Amber,
    }

    #[derive(Default)]
    struct Trace {
        log: Vec<&'static str>,
        ticks_in_red: u32,
    }

    struct Red;
    impl AgentState<Light, Trace> for Red {
        fn enter(&self, ctx: &mut Trace) -> Option<Light> {
            ctx.log.push("red.enter");
            None
        }
        fn update(&self, ctx: &mut Trace, _dt: f32) -> Option<Light> {
            ctx.ticks_in_red += 1;
            (ctx.ticks_in_red >= 2).then_some(Light::Amber)
        }
        fn exit(&self, ctx: &mut Trace) {
            ctx.log.push("red.exit");
        }
    }

    struct Amber;
    impl AgentState<Light, Trace> for Amber {
        fn enter(&self, ctx: &mut Trace) -> Option<Light> {
            ctx.log.push("amber.enter");
            Some(Light::Green)
        }
    }

    struct Green;
    impl AgentState<Light, Trace> for Green {
        fn enter(&self, ctx: &mut Trace) -> Option<Light> {
            ctx.log.push("green.enter");
            None
        }
        fn on_destination_reached(&self, ctx: &mut Trace) -> Option<Light> {
            ctx.log.push("green.reached");
            Some(Light::Red)
        }
    }

    struct Lights;
    impl StateLookup<Light, Trace> for Lights {
        fn handler(&self, key: Light) -> &dyn AgentState<Light, Trace> {
            match key {
                Light::Red => &Red,
                Light::Amber => &Amber,
                Light::Green => &Green,
            }
        }
    }

    #[test]
    fn test_update_transitions_through_enter_chain() {
        let mut state = Light::Red;
        let mut ctx = Trace::default();

        run_update(&Lights, &mut state, &mut ctx, 0.1);
        assert_eq!(state, Light::Red);

        // Second tick trips the threshold; Amber's enter chains to Green.
        run_update(&Lights, &mut state, &mut ctx, 0.1);
        assert_eq!(state, Light::Green);
        assert_eq!(ctx.log, vec!["red.exit", "amber.enter", "green.enter"]);
    }

    #[test]
    fn test_destination_reached_only_hits_active_state() {
        let mut state = Light::Green;
        let mut ctx = Trace::default();
        deliver_destination_reached(&Lights, &mut state, &mut ctx);
        assert_eq!(state, Light::Red);
        assert_eq!(ctx.log, vec!["green.reached", "red.enter"]);

        // Red has no reached-handler: signal is a no-op.
        ctx.log.clear();
        deliver_destination_reached(&Lights, &mut state, &mut ctx);
        assert_eq!(state, Light::Red);
        assert!(ctx.log.is_empty());
    }

    #[test]
    fn test_self_transition_is_a_no_op() {
        let mut state = Light::Green;
        let mut ctx = Trace::default();
        force_transition(&Lights, &mut state, Light::Green, &mut ctx);
        assert_eq!(state, Light::Green);
        assert!(ctx.log.is_empty());
    }

    struct PingA;
    struct PingB;
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Ping {
        A,
        B,
    }
    impl AgentState<Ping, u32> for PingA {
        fn enter(&self, count: &mut u32) -> Option<Ping> {
            *count += 1;
            Some(Ping::B)
        }
    }
    impl AgentState<Ping, u32> for PingB {
        fn enter(&self, count: &mut u32) -> Option<Ping> {
            *count += 1;
            Some(Ping::A)
        }
    }
    struct Pings;
    impl StateLookup<Ping, u32> for Pings {
        fn handler(&self, key: Ping) -> &dyn AgentState<Ping, u32> {
            match key {
                Ping::A => &PingA,
                Ping::B => &PingB,
            }
        }
    }

    #[test]
    fn test_transition_chain_is_bounded() {
        let mut state = Ping::A;
        let mut count = 0u32;
        force_transition(&Pings, &mut state, Ping::B, &mut count);
        // The driver stops at the chain bound instead of spinning forever.
        assert!(count <= 9);
    }
}
