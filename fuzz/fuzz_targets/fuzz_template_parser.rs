//! Fuzz target: CloudFormation template parser
//!
//! Feeds arbitrary JSON/YAML text through `Template::parse` and, when it
//! parses, through resource ordering and intrinsic rendering.
//!
//! Targets:
//! - Panics on unknown or malformed intrinsic shapes
//! - Cycles in DependsOn / Ref chains
//! - Stack overflow from deeply nested Fn:: calls

#![no_main]
use libfuzzer_sys::fuzz_target;

use cfn2tf_core::declarations::Declarations;
use cfn2tf_core::render::{render, RenderContext};
use cfn2tf_core::traits::TraitRegistry;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if input.len() > 64 * 1024 {
        return;
    }

    let Ok(template) = cfn2tf_core::template::Template::parse(input) else {
        return;
    };

    let order = template.resource_order();
    assert!(order.len() <= template.resources.len());

    let Ok(registry) = TraitRegistry::builtin() else {
        return;
    };
    let ctx = RenderContext::new(&template, &[], &registry);
    let mut decls = Declarations::from_template(&template);
    for resource in &template.resources {
        for intrinsic in resource.properties.intrinsics() {
            if let Ok(reference) = render(intrinsic, &ctx, &mut decls, None) {
                let _ = reference.to_string();
            }
        }
    }
    let _ = decls.to_hcl();
});
