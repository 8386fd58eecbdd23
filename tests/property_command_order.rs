// tests/property_command_order.rs

use proptest::prelude::*;

use procjob::descriptor::JobDescriptor;
use procjob::descriptor::factory::command_line_input;
use procjob::exec::{assemble_command, realize_inputs};
use procjob::types::{InputMap, Value, ValueKind};

// Each input i is an integer bound to flag `--a{i}` (or positional when
// `flags[i]` is false). The map is filled in a shuffled order.
fn job_with(flags: &[bool]) -> JobDescriptor {
    let mut builder = JobDescriptor::builder("order", "alpine:3", "/work")
        .command(["prog", "sub"])
        .default_flags(["--quiet"]);
    for (i, has_flag) in flags.iter().enumerate() {
        let flag = format!("--a{i}");
        let input = command_line_input(
            &format!("a{i}"),
            ValueKind::Integer,
            has_flag.then_some(flag.as_str()),
        )
        .unwrap()
        .build()
        .unwrap();
        builder = builder.input(input);
    }
    builder.build().unwrap()
}

proptest! {
    #[test]
    fn command_follows_declaration_order(
        cases in proptest::collection::vec((any::<bool>(), any::<i64>()), 1..12),
        seed in any::<u64>(),
    ) {
        let flags: Vec<bool> = cases.iter().map(|(f, _)| *f).collect();
        let job = job_with(&flags);

        let mut order: Vec<usize> = (0..cases.len()).collect();
        let n = order.len();
        for i in 0..n {
            let j = (seed.wrapping_mul(31).wrapping_add(i as u64) % n as u64) as usize;
            order.swap(i, j);
        }

        let mut raw = InputMap::new();
        for &i in &order {
            raw.insert(format!("a{i}"), vec![Value::Integer(cases[i].1)]);
        }

        let realized = realize_inputs(&job, &raw).unwrap();
        let command = assemble_command(&job, &realized).unwrap();

        let mut expected = vec!["prog".to_string(), "sub".to_string(), "--quiet".to_string()];
        for (i, (has_flag, value)) in cases.iter().enumerate() {
            if *has_flag {
                expected.push(format!("--a{i}"));
            }
            expected.push(value.to_string());
        }

        prop_assert_eq!(command, expected);
    }
}
