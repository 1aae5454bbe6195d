//! Fuzz target: terraform diagnostic decoding and fixing
//!
//! Decodes arbitrary text as a `terraform plan -json` stream and runs the
//! fixer for every decoded error against a small script.

#![no_main]
use libfuzzer_sys::fuzz_target;

use cfn2tf_core::repair::{HclScript, PlanErrorCollection, PlanFixer};

const SCRIPT: &str = "resource \"aws_dynamodb_table\" \"Table\" {\n  name = \"t\"\n  ttl {\n    enabled = false\n  }\n}\n";

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if input.len() > 64 * 1024 {
        return;
    }

    let Ok(errors) = PlanErrorCollection::from_json_lines(input) else {
        return;
    };
    let _ = errors.fingerprint();

    let mut script = HclScript::new(SCRIPT);
    for error in errors.iter() {
        let _ = PlanFixer::fix(&mut script, error);
        let _ = error.to_diagnostic();
    }
    let _ = script.to_string();
});
