// src/cache/key.rs

//! Cache keys.
//!
//! A key is the blake3 hash of everything that determines a job's outputs:
//! the resolved image id, the invocation template, handlers, output slots
//! and the realized input values. Inputs are hashed in declaration order, so the order of the raw
//! input map never matters.

use blake3::Hasher;

use crate::descriptor::JobDescriptor;
use crate::exec::orchestrator::RealizedInputs;
use crate::types::Value;

/// Length-prefixed so that adjacent fields cannot run into each other.
fn field(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn list(hasher: &mut Hasher, items: &[String]) {
    hasher.update(&(items.len() as u64).to_le_bytes());
    for item in items {
        field(hasher, item.as_bytes());
    }
}

fn value(hasher: &mut Hasher, value: &Value) {
    field(hasher, value.kind().to_string().as_bytes());
    match value {
        Value::Integer(v) => field(hasher, &v.to_le_bytes()),
        Value::Double(v) => field(hasher, &v.to_bits().to_le_bytes()),
        Value::Boolean(v) => field(hasher, &[u8::from(*v)]),
        Value::String(v) => field(hasher, v.as_bytes()),
        Value::BoundingBox(bbox) => {
            field(hasher, bbox.crs.as_bytes());
            for coordinate in bbox.lower.iter().chain(bbox.upper.iter()) {
                field(hasher, &coordinate.to_bits().to_le_bytes());
            }
        }
        Value::GenericFile(bytes) | Value::Geotiff(bytes) => field(hasher, bytes),
        Value::Xml(doc) => field(hasher, doc.text.as_bytes()),
        Value::Json(json) | Value::GeoJson(json) => field(hasher, json.to_string().as_bytes()),
    }
}

/// `image_id` is what the provider resolved `job.image()` to, not the
/// reference itself.
pub fn compute_cache_key(job: &JobDescriptor, image_id: &str, inputs: &RealizedInputs<'_>) -> String {
    let mut hasher = Hasher::new();

    field(&mut hasher, job.name().as_bytes());
    field(&mut hasher, image_id.as_bytes());
    field(&mut hasher, job.working_directory().as_bytes());
    list(&mut hasher, job.command());
    list(&mut hasher, job.default_flags());
    field(&mut hasher, format!("{:?}", job.stderr_handler()).as_bytes());
    field(&mut hasher, format!("{:?}", job.exit_code_handler()).as_bytes());

    for output in job.outputs() {
        field(&mut hasher, output.name().as_bytes());
        field(&mut hasher, output.kind().to_string().as_bytes());
        field(&mut hasher, format!("{:?}", output.source()).as_bytes());
    }

    hasher.update(&(inputs.len() as u64).to_le_bytes());
    for input in inputs.iter() {
        field(&mut hasher, input.descriptor.name().as_bytes());
        value(&mut hasher, &input.value);
    }

    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::factory::{command_line_input, stdout_output};
    use crate::exec::orchestrator::realize_inputs;
    use crate::types::{InputMap, ValueKind};

    fn job(image: &str) -> JobDescriptor {
        JobDescriptor::builder("echo", image, "/work")
            .command(["echo"])
            .input(
                command_line_input("a", ValueKind::Integer, None)
                    .unwrap()
                    .build()
                    .unwrap(),
            )
            .input(
                command_line_input("b", ValueKind::String, None)
                    .unwrap()
                    .build()
                    .unwrap(),
            )
            .output(stdout_output("out", ValueKind::String).build().unwrap())
            .build()
            .unwrap()
    }

    fn raw(a: i64, b: &str) -> InputMap {
        let mut map = InputMap::new();
        map.insert("b".into(), vec![Value::String(b.into())]);
        map.insert("a".into(), vec![Value::Integer(a)]);
        map
    }

    #[test]
    fn same_inputs_give_same_key() {
        let job = job("alpine");
        let first = compute_cache_key(&job, "sha256:aa", &realize_inputs(&job, &raw(1, "x")).unwrap());
        let second = compute_cache_key(&job, "sha256:aa", &realize_inputs(&job, &raw(1, "x")).unwrap());
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn different_inputs_or_image_id_change_key() {
        let job = job("alpine:3");
        let realized = realize_inputs(&job, &raw(1, "x")).unwrap();
        let base = compute_cache_key(&job, "sha256:aa", &realized);
        let other_input = compute_cache_key(&job, "sha256:aa", &realize_inputs(&job, &raw(2, "x")).unwrap());
        let rebuilt = compute_cache_key(&job, "sha256:bb", &realized);
        assert_ne!(base, other_input);
        assert_ne!(base, rebuilt);
    }

    #[test]
    fn image_reference_alone_does_not_decide_the_key() {
        let alpine = job("alpine:3");
        let pinned = job("alpine@sha256:aa");
        let a = compute_cache_key(&alpine, "sha256:aa", &realize_inputs(&alpine, &raw(1, "x")).unwrap());
        let b = compute_cache_key(&pinned, "sha256:aa", &realize_inputs(&pinned, &raw(1, "x")).unwrap());
        assert_eq!(a, b);
    }
}
