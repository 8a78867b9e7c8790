use std::sync::Arc;

use opgraph::prelude::*;

#[derive(Debug)]
struct Split {
    id: OperationId,
}

impl Operation for Split {
    fn id(&self) -> OperationId {
        self.id
    }
    fn type_name(&self) -> &str {
        "Split"
    }
    fn output_arity(&self) -> Option<usize> {
        Some(2)
    }
}

#[test]
fn outputs_of_one_operation_compile_into_a_region() -> anyhow::Result<()> {
    let split: OperationRef = Arc::new(Split {
        id: OperationId::unique(),
    });

    let mut head = OpaqueHostValue::node(Some(Role::new(split.clone(), 0)), None)?;
    let mut count = ScalarValue::node(ScalarType::Int64, Some(Role::new(split.clone(), 1)), None)?;
    head.set_data(Some(HostValue::new(vec!["a".to_string(), "b".to_string()])))?;
    count.set_data(Some(HostValue::new(2_i64)))?;

    assert_eq!(head.name(), "Split.0");
    assert_eq!(count.name(), "Split.1");
    assert_eq!(count.state(), ValueState::Computed);

    let mut builder = RegionBuilder::new("split", &HostAbi::default())?;
    builder
        .bind(&head, NativeBinding::new("head")?, Terminal::Sync)?
        .bind(&count, NativeBinding::new("count")?, Terminal::Cleanup)?;
    let region = builder
        .build(|_| NativeBlock::new())?
        .expect("both kinds compile");

    let code = region.code.render(&HostAbi::default());
    assert!(code.contains("HostObject* head = NULL;"));
    assert!(code.contains("int64_t count = 0;"));
    assert!(code.contains("goto split_fail_1;"));
    assert!(code.contains("split_failed:;"));
    assert_eq!(region.requirements.libraries, vec!["m".to_string()]);

    let literal = count.kind().literal_encoding(count.data())?;
    assert_eq!(literal.to_string(), "INT64_C(2)");

    Ok(())
}

#[test]
fn rebinding_to_another_operation_conflicts() -> anyhow::Result<()> {
    let first: OperationRef = Arc::new(Split {
        id: OperationId::unique(),
    });
    let second: OperationRef = Arc::new(Split {
        id: OperationId::unique(),
    });
    let mut node = OpaqueHostValue::node(Some(Role::new(first.clone(), 1)), None)?;

    node.set_role(first, 1)?;
    let err = node.set_role(second, 1).unwrap_err();

    assert!(matches!(err, ValueError::OwnershipConflict { .. }));
    assert!(err.to_string().starts_with("Value Split.1 cannot be rebound"));

    Ok(())
}
