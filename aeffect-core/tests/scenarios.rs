//! End-to-end scenarios exercising the public API together, rather than
//! one component at a time the way the unit tests under `src/` do.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use aeffect_core::{find, linear_handler, mask, myield_to, prompt_handler, under, with_data, yield_to, Kind};

#[test]
fn linear_handler_exposes_caller_owned_state_to_nested_code() {
    let ask = Kind::fresh();
    let mut balance = 100i32;
    let withdrawn = linear_handler(ask, &mut balance, 30, |amount| {
        let h = find(ask).expect("handler installed");
        with_data::<i32, i32>(&h, |b| {
            *b -= amount;
            amount
        })
    });
    assert_eq!(withdrawn, 30);
    assert_eq!(balance, 70);
}

#[test]
fn nested_handlers_of_the_same_kind_resolve_innermost_first() {
    let log = Kind::fresh();
    let mut outer_log = Vec::<&'static str>::new();
    linear_handler(log, &mut outer_log, (), |()| {
        let mut inner_log = Vec::<&'static str>::new();
        linear_handler(log, &mut inner_log, (), |()| {
            let h = find(log).unwrap();
            with_data::<Vec<&'static str>, ()>(&h, |v| v.push("from innermost"));
        });
        assert_eq!(inner_log, vec!["from innermost"]);
    });
    assert!(outer_log.is_empty(), "outer handler must not have been reached");
}

#[test]
fn one_shot_yield_resumes_with_a_value_computed_from_handler_local_data() {
    let ask = Kind::fresh();
    let result = prompt_handler(ask, || 0i32, 10i32, move |arg: i32| -> i32 {
        let h = find(ask).expect("handler installed");
        let answer: i32 = yield_to::<i32, i32, i32, i32, _>(&h, |token| {
            let doubled = with_data::<i32, i32>(&h, |v| {
                *v += 1;
                *v * 2
            });
            token.resume(doubled);
        });
        answer + arg
    });
    assert_eq!(result, 12);
}

#[test]
fn under_makes_the_immediately_enclosing_handler_invisible_to_one_region() {
    let ask = Kind::fresh();
    let mut outer_state = 1i32;
    linear_handler(ask, &mut outer_state, (), |()| {
        let seen_inside = under(ask, || find(ask));
        assert!(seen_inside.is_none(), "the outer handler should be hidden");

        let seen_after = find(ask);
        assert!(seen_after.is_some(), "the outer handler reappears once under's scope ends");
    });
}

#[test]
fn mask_hides_exactly_the_requested_number_of_enclosing_matches() {
    let ask = Kind::fresh();
    let mut outer = 1i32;
    linear_handler(ask, &mut outer, (), |()| {
        let mut inner = 2i32;
        linear_handler(ask, &mut inner, (), |()| {
            let found = mask(ask, 0, || find(ask));
            let found = found.expect("the outer handler should still be reachable");
            let seen = with_data::<i32, i32>(&found, |v| *v);
            assert_eq!(seen, 1, "mask(0) should hide only the innermost match");
        });
    });
}

#[test]
fn multi_shot_resume_runs_the_continuation_once_per_call_in_order() {
    let choose = Kind::fresh();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_handler = seen.clone();

    let result = prompt_handler(choose, || (), (), move |()| -> i32 {
        let h = find(choose).expect("handler installed");
        let picked: bool = myield_to::<(), (), i32, bool, _>(&h, |token| {
            let r1 = token.resume(true);
            let r2 = token.resume(false);
            seen_in_handler.lock().unwrap().push((r1, r2));
        });
        if picked {
            1
        } else {
            2
        }
    });

    assert_eq!(*seen.lock().unwrap(), vec![(1, 2)]);
    assert_eq!(result, 2, "the prompt's final result is the last resume's outcome");
}

#[test]
fn resume_unwind_forces_the_prompt_to_settle_on_the_default_result() {
    let ask = Kind::fresh();
    let result = prompt_handler(ask, || (), (), |()| -> i32 {
        let h = find(ask).expect("handler installed");
        let _never: i32 = yield_to::<(), (), i32, i32, _>(&h, |token| {
            token.resume_unwind();
        });
        unreachable!("body must not run past an unwound yield");
    });
    assert_eq!(result, 0, "resume_unwind discards any value and settles on R::default()");
}

#[test]
fn resuming_a_one_shot_token_twice_is_a_contract_violation() {
    let ask = Kind::fresh();
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        prompt_handler(ask, || (), (), |()| -> i32 {
            let h = find(ask).expect("handler installed");
            yield_to::<(), (), i32, i32, _>(&h, |token| {
                let _ = token.resume(1);
                let _ = token.resume(2);
            })
        })
    }));
    assert!(outcome.is_err());
}

#[test]
fn resume_drop_discards_the_continuation_and_yields_a_default_result() {
    let ask = Kind::fresh();
    let result = prompt_handler(ask, || (), (), |()| -> i32 {
        let h = find(ask).expect("handler installed");
        let _never: i32 = yield_to::<(), (), i32, i32, _>(&h, |token| {
            token.resume_drop();
        });
        unreachable!("body must not run past a dropped yield");
    });
    assert_eq!(result, 0, "dropping a token settles the prompt on R::default()");
}

#[test]
fn leaking_a_resume_token_without_consuming_it_is_detected() {
    let ask = Kind::fresh();
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        prompt_handler(ask, || (), (), |()| -> i32 {
            let h = find(ask).expect("handler installed");
            yield_to::<(), (), i32, i32, _>(&h, |_token| {
                // Intentionally never call resume/resume_tail/resume_unwind/resume_drop.
            })
        })
    }));
    assert!(
        outcome.is_err(),
        "a resume token dropped unconsumed must panic, not silently leak"
    );
}
