//! Parameter automation for voices.
//!
//! A `Param` is a short timeline of value events, evaluated at any time
//! offset (seconds since the voice started). The ramp rules follow the
//! browser audio-param model so envelopes read the same as the hand-tuned
//! curves they come from.

#[derive(Clone, Copy, Debug, PartialEq)]
enum Ramp {
    Set,
    Linear,
    Exponential,
}

#[derive(Clone, Copy, Debug)]
struct Event {
    time: f32,
    value: f32,
    ramp: Ramp,
}

#[derive(Clone, Debug)]
pub struct Param {
    initial: f32,
    events: Vec<Event>,
}

impl Param {
    pub fn constant(value: f32) -> Self {
        Self {
            initial: value,
            events: Vec::new(),
        }
    }

    /// Jump to `value` at `time`.
    pub fn set(mut self, time: f32, value: f32) -> Self {
        self.push(time, value, Ramp::Set);
        self
    }

    /// Ramp linearly from the previous event to `value`, arriving at `time`.
    pub fn linear_to(mut self, time: f32, value: f32) -> Self {
        self.push(time, value, Ramp::Linear);
        self
    }

    /// Ramp exponentially from the previous event to `value`, arriving at `time`.
    pub fn exponential_to(mut self, time: f32, value: f32) -> Self {
        self.push(time, value, Ramp::Exponential);
        self
    }

    // events are kept sorted; equal times keep insertion order
    fn push(&mut self, time: f32, value: f32, ramp: Ramp) {
        let at = self.events.partition_point(|e| e.time <= time);
        self.events.insert(at, Event { time, value, ramp });
    }

    #[cfg(test)]
    pub fn peak(&self) -> f32 {
        self.events
            .iter()
            .map(|e| e.value.abs())
            .fold(self.initial.abs(), f32::max)
    }

    pub fn value_at(&self, t: f32) -> f32 {
        let next = self.events.partition_point(|e| e.time <= t);
        let (t0, v0) = match next.checked_sub(1) {
            Some(i) => (self.events[i].time, self.events[i].value),
            None => (0.0, self.initial),
        };
        let Some(target) = self.events.get(next) else {
            return v0; // past the last event: hold
        };

        let span = target.time - t0;
        if span <= 0.0 {
            return v0;
        }
        let frac = ((t - t0) / span).clamp(0.0, 1.0);
        match target.ramp {
            Ramp::Set => v0,
            Ramp::Linear => v0 + (target.value - v0) * frac,
            Ramp::Exponential => {
                // zero or sign-crossing endpoints can't be ramped exponentially; hold instead
                if v0 == 0.0 || target.value == 0.0 || (v0 < 0.0) != (target.value < 0.0) {
                    v0
                } else {
                    v0 * (target.value / v0).powf(frac)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn constant_holds_forever() {
        let p = Param::constant(0.4);
        assert_eq!(p.value_at(0.0), 0.4);
        assert_eq!(p.value_at(100.0), 0.4);
    }

    #[test]
    fn linear_ramp_hits_midpoint() {
        let p = Param::constant(0.0).set(0.0, 0.0).linear_to(1.0, 1.0);
        assert!(close(p.value_at(0.5), 0.5));
        assert!(close(p.value_at(1.0), 1.0));
        assert!(close(p.value_at(3.0), 1.0));
    }

    #[test]
    fn exponential_ramp_is_geometric() {
        let p = Param::constant(1.0).set(0.0, 1.0).exponential_to(1.0, 0.01);
        // halfway through 1 -> 0.01 is sqrt(0.01)
        assert!(close(p.value_at(0.5), 0.1));
        assert!(close(p.value_at(1.0), 0.01));
    }

    #[test]
    fn exponential_ramp_from_zero_holds_instead_of_nan() {
        let p = Param::constant(0.0).set(0.0, 0.0).exponential_to(1.0, 0.001);
        let v = p.value_at(0.5);
        assert!(v.is_finite());
        assert_eq!(v, 0.0);
    }

    #[test]
    fn set_event_is_a_step() {
        let p = Param::constant(1.0).set(0.5, 2.0);
        assert_eq!(p.value_at(0.49), 1.0);
        assert_eq!(p.value_at(0.5), 2.0);
    }

    #[test]
    fn chained_segments_follow_each_other() {
        let p = Param::constant(0.0)
            .set(0.0, 0.0)
            .linear_to(0.01, 1.0)
            .exponential_to(0.03, 0.1)
            .linear_to(0.04, 0.8);
        assert!(close(p.value_at(0.01), 1.0));
        assert!(close(p.value_at(0.03), 0.1));
        assert!(close(p.value_at(0.035), 0.45));
        assert_eq!(p.peak(), 1.0);
    }
}
