use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use fedgraph::value::NamedRecord;
use fedgraph::{
    assemble_result_from_graph, capture_result_from_graph, stamp_parameter_in_graph, Binding,
    ContainerKind, DType, Error, Graph, HostTensor, Session, Shape, TensorHandle, Type, Value,
};

fn tensor_names(value: &Value) -> Vec<String> {
    match value {
        Value::Tensor(tensor) => vec![tensor.name()],
        Value::Dataset(dataset) => dataset
            .variant_tensor()
            .map(TensorHandle::name)
            .into_iter()
            .collect(),
        other => {
            let mut names = Vec::new();
            let mut index = 0;
            while let Some(element) = other.element(index) {
                names.extend(tensor_names(element));
                index += 1;
            }
            names
        }
    }
}

#[test]
fn captured_results_assemble_back() -> Result<()> {
    let mut graph = Graph::new();
    let x = graph.placeholder("x", DType::F32, Shape::from_static(&[2]))?;
    let result = Value::OrderedDict(vec![
        ("w".to_string(), Value::Tensor(x.clone())),
        (
            "nested".to_string(),
            Value::Tuple(vec![Value::Int(3), Value::Tensor(x)]),
        ),
    ]);
    let (ty, binding) = capture_result_from_graph(&result, &mut graph)?;
    assert_eq!(ty.to_string(), "<w=float32[2],nested=<int32,float32[2]>>");

    let assembled = assemble_result_from_graph(&ty, &binding, &graph.tensor_table())?;
    let Value::OrderedDict(entries) = &assembled else {
        panic!("expected an ordered dict, got {assembled:?}");
    };
    let keys: Vec<_> = entries.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, ["w", "nested"]);
    assert!(matches!(assembled.field("nested"), Some(Value::Tuple(items)) if items.len() == 2));
    assert_eq!(tensor_names(&assembled), ["x:0", "Const:0", "x:0"]);

    let (recaptured, _) = capture_result_from_graph(&assembled, &mut graph)?;
    assert_eq!(recaptured, ty);
    Ok(())
}

#[test]
fn assembled_results_fetch_the_captured_values() -> Result<()> {
    let mut graph = Graph::new();
    let result = Value::List(vec![
        Value::Int(3),
        Value::Float(0.5),
        Value::OrderedDict(vec![(
            "w".to_string(),
            Value::Array(HostTensor::from_vec(vec![1.5f64, 2.5])),
        )]),
    ]);
    let (ty, binding) = capture_result_from_graph(&result, &mut graph)?;
    let assembled = assemble_result_from_graph(&ty, &binding, &graph.tensor_table())?;
    let fetched = Session::new(&graph).fetch_value(&assembled)?;
    assert_eq!(
        fetched,
        Value::List(vec![
            Value::Array(HostTensor::from(3i32)),
            Value::Array(HostTensor::from(0.5f32)),
            Value::OrderedDict(vec![(
                "w".to_string(),
                Value::Array(HostTensor::from_vec(vec![1.5f64, 2.5])),
            )]),
        ])
    );
    Ok(())
}

#[test]
fn containers_are_restored_from_tags() -> Result<()> {
    let mut graph = Graph::new();
    let dict = Value::Dict(BTreeMap::from([
        ("b".to_string(), Value::Bool(true)),
        ("a".to_string(), Value::Int(1)),
    ]));
    let (ty, binding) = capture_result_from_graph(&dict, &mut graph)?;
    let table = graph.tensor_table();
    let assembled = assemble_result_from_graph(&ty, &binding, &table)?;
    assert!(matches!(&assembled, Value::Dict(map) if map.len() == 2));

    let record = Value::Record(NamedRecord::new("Stats", [("loss", Value::Float(0.5))]));
    let (ty, binding) = capture_result_from_graph(&record, &mut graph)?;
    let assembled = assemble_result_from_graph(&ty, &binding, &graph.tensor_table())?;
    let Value::Record(restored) = assembled else {
        panic!("expected a record");
    };
    assert_eq!(restored.type_name, "Stats");
    assert_eq!(
        ty.container(),
        Some(&ContainerKind::Record {
            name: "Stats".to_string()
        })
    );
    Ok(())
}

#[test]
fn untagged_tuples_assemble_as_anonymous() -> Result<()> {
    let mut graph = Graph::new();
    let ty: Type = "<a=int32,bool>".parse()?;
    let (_, binding) = stamp_parameter_in_graph("p", &ty, &mut graph)?;
    let assembled = assemble_result_from_graph(&ty, &binding, &graph.tensor_table())?;
    let Value::Anonymous(tuple) = assembled else {
        panic!("expected an anonymous tuple");
    };
    assert_eq!(tuple.elements[0].0.as_deref(), Some("a"));
    assert_eq!(tuple.elements[1].0, None);
    Ok(())
}

#[test]
fn sequences_assemble_as_datasets() -> Result<()> {
    let mut graph = Graph::new();
    let (_, binding) = stamp_parameter_in_graph("ds", "float32[?]*", &mut graph)?;
    let assembled = assemble_result_from_graph("float32[?]*", &binding, &graph.tensor_table())?;
    let dataset = assembled.as_dataset().expect("dataset");
    assert_eq!(dataset.element_type().to_string(), "float32[?]");
    assert_eq!(
        dataset.variant_tensor().map(TensorHandle::name),
        Some("ds:0".to_string())
    );
    Ok(())
}

#[test]
fn missing_names_fail_lookup() {
    let err =
        assemble_result_from_graph(DType::I32, &Binding::tensor("gone:0"), &HashMap::new())
            .unwrap_err();
    assert!(matches!(err, Error::LookupFailure { name } if name == "gone:0"));
}

#[test]
fn binding_and_type_must_agree() -> Result<()> {
    let mut graph = Graph::new();
    let (_, binding) = stamp_parameter_in_graph("x", DType::I32, &mut graph)?;
    let table = graph.tensor_table();

    let tuple_type = Type::unnamed([Type::from(DType::I32)]);
    assert!(matches!(
        assemble_result_from_graph(&tuple_type, &binding, &table),
        Err(Error::TypeMismatch(_))
    ));
    assert!(matches!(
        assemble_result_from_graph(DType::Bool, &binding, &table),
        Err(Error::TypeMismatch(_))
    ));
    let short = Binding::tuple(vec![]);
    assert!(matches!(
        assemble_result_from_graph(&tuple_type, &short, &table),
        Err(Error::TypeMismatch(_))
    ));
    assert!(matches!(
        assemble_result_from_graph(DType::I32, &Binding::default(), &table),
        Err(Error::UnknownBindingVariant)
    ));
    Ok(())
}
