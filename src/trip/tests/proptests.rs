use crate::leg::{FlightLeg, LegStatus};
use crate::trip::tests::utils::trip_with_legs;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    CheckAndAdvance(usize),
    CompleteActive,
    ActivateNext,
    Skip(usize),
}

fn arb_leg() -> impl Strategy<Value = FlightLeg> {
    // legs either fully timed (eligible to advance) or untouched
    prop_oneof![
        Just(FlightLeg::new("DEN", "ORD")),
        Just({
            let mut leg = FlightLeg::new("ORD", "SFO");
            leg.out_time = "0800".to_string();
            leg.off_time = "0812".to_string();
            leg.on_time = "0950".to_string();
            leg.in_time = "1002".to_string();
            leg
        }),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..6usize).prop_map(Op::CheckAndAdvance),
        Just(Op::CompleteActive),
        Just(Op::ActivateNext),
        (0..6usize).prop_map(Op::Skip),
    ]
}

proptest! {
    #[test]
    fn test_lifecycle_invariants_hold(
        legs in prop::collection::vec(arb_leg(), 1..6),
        ops in prop::collection::vec(arb_op(), 0..40)
    ) {
        let mut trip = trip_with_legs(legs);

        for op in ops {
            match op {
                Op::CheckAndAdvance(i) => trip.check_and_advance_leg(i),
                Op::CompleteActive => trip.complete_active_leg(true),
                Op::ActivateNext => trip.activate_next_standby_leg(),
                Op::Skip(i) => trip.skip_leg(i),
            }

            let active = trip.legs().filter(|l| l.status == LegStatus::Active).count();
            prop_assert!(active <= 1, "\n{} active legs after {:?}", active, trip.legs().map(|l| l.status).collect::<Vec<_>>());

            // ignoring skipped legs, flat order reads completed*, active?, standby*
            let statuses: Vec<LegStatus> = trip.legs()
                .map(|l| l.status)
                .filter(|s| *s != LegStatus::Skipped)
                .collect();
            let first_open = statuses.iter()
                .position(|s| *s != LegStatus::Completed)
                .unwrap_or(statuses.len());
            prop_assert!(
                statuses[first_open..].iter().all(|s| *s != LegStatus::Completed),
                "\ncompleted leg after an open leg: {:?}", statuses
            );
            prop_assert!(
                statuses[first_open..].iter().skip(1).all(|s| *s == LegStatus::Standby),
                "\nactive leg after a standby leg: {:?}", statuses
            );
        }
    }

    #[test]
    fn test_check_and_advance_idempotent(
        legs in prop::collection::vec(arb_leg(), 1..6),
        index in 0..6usize
    ) {
        let mut trip = trip_with_legs(legs);

        trip.check_and_advance_leg(index);
        let once: Vec<LegStatus> = trip.legs().map(|l| l.status).collect();

        trip.check_and_advance_leg(index);
        let twice: Vec<LegStatus> = trip.legs().map(|l| l.status).collect();

        prop_assert_eq!(once, twice);
    }
}
