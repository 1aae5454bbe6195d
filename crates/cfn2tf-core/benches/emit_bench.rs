use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use cfn2tf_core::emitter::{emit_resource, HclEmitter};
use cfn2tf_core::schema::ProviderSchema;
use cfn2tf_core::serializer::serialize_resource;
use cfn2tf_core::template::Template;
use cfn2tf_core::traits::TraitRegistry;
use cfn2tf_core::value::Value;

/// A security group with many rules and a bucket policy document.
fn large_attributes() -> Value {
    let ingress: Vec<_> = (0..200)
        .map(|i| {
            json!({
                "cidr_blocks": [format!("10.{}.0.0/16", i)],
                "description": format!("rule {}", i),
                "from_port": 1000 + i,
                "to_port": 1000 + i,
                "protocol": "tcp",
                "self": false,
                "ipv6_cidr_blocks": [],
                "prefix_list_ids": [],
                "security_groups": []
            })
        })
        .collect();
    let tags: serde_json::Map<String, serde_json::Value> =
        (0..50).map(|i| (format!("tag{}", i), json!(format!("value-{}", i)))).collect();
    Value::from(json!({
        "id": "sg-0123456789",
        "arn": "arn:aws:ec2:us-east-1:123456789012:security-group/sg-0123456789",
        "name": "bench",
        "description": "benchmark group",
        "vpc_id": "vpc-0123",
        "ingress": ingress,
        "egress": [],
        "tags": tags,
        "tags_all": {}
    }))
}

fn bench_serialize(c: &mut Criterion) {
    let registry = TraitRegistry::builtin().unwrap();
    let traits = registry.get_traits("aws_security_group");
    let schema = ProviderSchema::default().resource_schema("aws_security_group");
    let value = large_attributes();

    c.bench_function("serialize_security_group_200_rules", |b| {
        b.iter(|| {
            let events = serialize_resource("aws_security_group", "Group", black_box(&value), &traits, &schema);
            black_box(events);
        })
    });
}

fn bench_emit(c: &mut Criterion) {
    let registry = TraitRegistry::builtin().unwrap();
    let traits = registry.get_traits("aws_security_group");
    let schema = ProviderSchema::default().resource_schema("aws_security_group");
    let events = serialize_resource("aws_security_group", "Group", &large_attributes(), &traits, &schema);

    c.bench_function("emit_security_group_200_rules", |b| {
        b.iter(|| {
            let text = emit_resource(&traits, black_box(events.clone())).unwrap();
            black_box(text);
        })
    });
}

fn bench_emit_stream(c: &mut Criterion) {
    let registry = TraitRegistry::builtin().unwrap();
    let traits = registry.get_traits("aws_s3_bucket");
    let schema = ProviderSchema::default().resource_schema("aws_s3_bucket");
    let streams: Vec<_> = (0..100)
        .map(|i| {
            let value = Value::from(json!({
                "bucket": format!("bucket-{}", i),
                "acl": null,
                "policy": "{\"Version\":\"2012-10-17\",\"Statement\":[{\"Effect\":\"Allow\",\"Action\":\"s3:GetObject\",\"Resource\":\"*\"}]}",
                "versioning": [ { "enabled": true, "mfa_delete": false } ]
            }));
            serialize_resource("aws_s3_bucket", &format!("Bucket{}", i), &value, &traits, &schema)
        })
        .collect();

    c.bench_function("emit_100_buckets", |b| {
        b.iter(|| {
            let mut emitter = HclEmitter::new(&registry);
            for events in &streams {
                black_box(emitter.emit_all(events.clone()));
            }
            black_box(emitter.finish().unwrap());
        })
    });
}

fn bench_parse_template(c: &mut Criterion) {
    let mut yaml = String::from("Resources:\n");
    for i in 0..100 {
        yaml.push_str(&format!(
            "  Bucket{i}:\n    Type: AWS::S3::Bucket\n    Properties:\n      BucketName: !Sub '${{AWS::StackName}}-{i}'\n"
        ));
        if i > 0 {
            yaml.push_str(&format!("    DependsOn: Bucket{}\n", i - 1));
        }
    }

    c.bench_function("parse_and_order_100_resources", |b| {
        b.iter(|| {
            let template = Template::parse(black_box(&yaml)).unwrap();
            black_box(template.resource_order());
        })
    });
}

criterion_group!(benches, bench_serialize, bench_emit, bench_emit_stream, bench_parse_template);
criterion_main!(benches);
