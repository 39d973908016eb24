use std::collections::BTreeMap;

use anyhow::Result;
use fedgraph::binding::BindingVariant;
use fedgraph::data::Dataset;
use fedgraph::graph::Op;
use fedgraph::value::{AnonymousTuple, NamedRecord};
use fedgraph::{
    capture_result_from_graph, Binding, ContainerKind, DType, Error, Graph, HostTensor, Session,
    Shape, Structure, Type, Value,
};

#[test]
fn host_scalars_become_constants() -> Result<()> {
    let mut graph = Graph::new();
    let cases = [
        (Value::from("a"), "string"),
        (Value::Bool(true), "bool"),
        (Value::Int(10), "int32"),
        (Value::Float(0.5), "float32"),
    ];
    for (value, expected) in cases {
        let (ty, binding) = capture_result_from_graph(&value, &mut graph)?;
        assert_eq!(ty.to_string(), expected);
        let Ok(BindingVariant::Tensor(tensor)) = binding.variant() else {
            panic!("expected a tensor binding for {value:?}");
        };
        assert_eq!(graph.get_tensor_by_name(&tensor.tensor_name)?.op(), Op::Const);
    }
    Ok(())
}

#[test]
fn first_constant_is_named_const() -> Result<()> {
    let mut graph = Graph::new();
    let (_, first) = capture_result_from_graph(&Value::Int(1), &mut graph)?;
    let (_, second) = capture_result_from_graph(&Value::Int(2), &mut graph)?;
    assert_eq!(first, Binding::tensor("Const:0"));
    assert_eq!(second, Binding::tensor("Const_1:0"));
    Ok(())
}

#[test]
fn oversized_int_is_rejected() {
    let mut graph = Graph::new();
    let err = capture_result_from_graph(&Value::Int(1 << 40), &mut graph).unwrap_err();
    assert!(matches!(err, Error::TypeMismatch(_)));
}

#[test]
fn arrays_keep_their_dtype_and_shape() -> Result<()> {
    let mut graph = Graph::new();
    let array = HostTensor::from_shape_vec(&[2, 3], vec![0i64; 6])?;
    let (ty, _) = capture_result_from_graph(&Value::Array(array), &mut graph)?;
    assert_eq!(ty.to_string(), "int64[2,3]");

    let (ty, _) = capture_result_from_graph(&Value::Array(HostTensor::from(1.5f64)), &mut graph)?;
    assert_eq!(ty, Type::scalar(DType::F64));
    Ok(())
}

#[test]
fn graph_tensors_are_bound_directly() -> Result<()> {
    let mut graph = Graph::new();
    let x = graph.placeholder("x", DType::F32, Shape::from_static(&[3]))?;
    let (ty, binding) = capture_result_from_graph(&Value::Tensor(x), &mut graph)?;
    assert_eq!(ty.to_string(), "float32[3]");
    assert_eq!(binding, Binding::tensor("x:0"));
    Ok(())
}

#[test]
fn foreign_tensor_is_a_graph_reference_error() -> Result<()> {
    let mut other = Graph::new();
    let x = other.placeholder("x", DType::F32, Shape::scalar())?;
    let mut graph = Graph::new();
    let err = capture_result_from_graph(&Value::Tensor(x), &mut graph).unwrap_err();
    assert!(matches!(err, Error::GraphReference(_)));
    Ok(())
}

#[test]
fn variables_are_read_before_binding() -> Result<()> {
    let mut graph = Graph::new();
    let var = graph.variable("v", HostTensor::from(3i32))?;
    let (ty, binding) = capture_result_from_graph(&Value::Variable(var.clone()), &mut graph)?;
    assert_eq!(ty.to_string(), "int32");
    assert_eq!(binding, Binding::tensor("v/read:0"));

    let (ty, binding) = capture_result_from_graph(&Value::Tensor(var.handle().clone()), &mut graph)?;
    assert_eq!(ty.to_string(), "int32");
    assert_eq!(binding, Binding::tensor("Identity:0"));
    Ok(())
}

#[test]
fn dict_keys_are_sorted() -> Result<()> {
    let mut graph = Graph::new();
    let value = Value::Dict(BTreeMap::from([
        ("b".to_string(), Value::Int(1)),
        ("a".to_string(), Value::Bool(false)),
    ]));
    let (ty, _) = capture_result_from_graph(&value, &mut graph)?;
    assert_eq!(ty.to_string(), "<a=bool,b=int32>");
    assert_eq!(ty.container(), Some(&ContainerKind::Dict));
    Ok(())
}

#[test]
fn ordered_containers_keep_their_order() -> Result<()> {
    let mut graph = Graph::new();
    let ordered = Value::OrderedDict(vec![
        ("b".to_string(), Value::Int(1)),
        ("a".to_string(), Value::Bool(false)),
    ]);
    let (ty, _) = capture_result_from_graph(&ordered, &mut graph)?;
    assert_eq!(ty.to_string(), "<b=int32,a=bool>");
    assert_eq!(ty.container(), Some(&ContainerKind::OrderedDict));

    let record = Value::NamedTuple(NamedRecord::new(
        "Point",
        [("y", Value::Float(1.0)), ("x", Value::Float(2.0))],
    ));
    let (ty, _) = capture_result_from_graph(&record, &mut graph)?;
    assert_eq!(ty.to_string(), "<y=float32,x=float32>");
    assert_eq!(
        ty.container(),
        Some(&ContainerKind::NamedTuple {
            name: "Point".to_string()
        })
    );

    let attrs = Value::Record(NamedRecord::new("Config", [("lr", Value::Float(0.1))]));
    let (ty, _) = capture_result_from_graph(&attrs, &mut graph)?;
    assert_eq!(
        ty.container(),
        Some(&ContainerKind::Record {
            name: "Config".to_string()
        })
    );
    Ok(())
}

#[test]
fn positional_and_anonymous_tuples() -> Result<()> {
    let mut graph = Graph::new();
    let list = Value::List(vec![Value::Int(1), Value::from("x")]);
    let (ty, binding) = capture_result_from_graph(&list, &mut graph)?;
    assert_eq!(ty.to_string(), "<int32,string>");
    assert_eq!(ty.container(), Some(&ContainerKind::List));
    assert_eq!(binding.which(), Some("tuple"));

    let anonymous = Value::Anonymous(AnonymousTuple::new(vec![
        (Some("a".to_string()), Value::Int(1)),
        (None, Value::Tuple(vec![Value::Bool(true)])),
    ]));
    let (ty, _) = capture_result_from_graph(&anonymous, &mut graph)?;
    assert_eq!(ty.to_string(), "<a=int32,<bool>>");
    assert_eq!(ty.container(), None);
    Ok(())
}

#[test]
fn graph_datasets_bind_their_variant() -> Result<()> {
    let mut graph = Graph::new();
    let dataset = Dataset::range(Some(&mut graph), 0, 5, 1)?;
    let variant = dataset.variant_tensor().expect("graph dataset").name();
    let (ty, binding) = capture_result_from_graph(&Value::Dataset(dataset), &mut graph)?;
    assert_eq!(ty.to_string(), "int64*");
    assert_eq!(binding, Binding::sequence(variant));
    Ok(())
}

#[test]
fn single_element_datasets_bind_their_variant() -> Result<()> {
    let mut graph = Graph::new();
    let element = Structure::Leaf(HostTensor::from(10i32));
    let dataset = Dataset::from_tensors(Some(&mut graph), element)?;
    let (ty, binding) = capture_result_from_graph(&Value::Dataset(dataset.clone()), &mut graph)?;
    assert_eq!(ty.to_string(), "int32*");
    assert_eq!(binding, Binding::sequence("TensorDataset:0"));
    assert_eq!(graph.get_tensor_by_name("TensorDataset:0")?.op(), Op::TensorDataset);

    let rows = Session::new(&graph).dataset_rows(&dataset)?;
    assert_eq!(rows, [Structure::Leaf(HostTensor::from(10i32))]);
    Ok(())
}

#[test]
fn eager_datasets_get_a_variant_placeholder() -> Result<()> {
    let mut graph = Graph::new();
    let dataset = Dataset::from_tensor_slices(
        None,
        Structure::Leaf(HostTensor::from_vec(vec![1.0f32, 2.0])),
    )?;
    let (ty, binding) = capture_result_from_graph(&Value::Dataset(dataset), &mut graph)?;
    assert_eq!(ty.to_string(), "float32*");
    assert_eq!(binding, Binding::sequence("Placeholder:0"));
    let placeholder = graph.get_tensor_by_name("Placeholder:0")?;
    assert_eq!(placeholder.dtype(), DType::Variant);
    Ok(())
}

#[test]
fn unsupported_values_are_type_mismatches() {
    let mut graph = Graph::new();
    for value in [Value::None, Value::Opaque("socket".to_string())] {
        let err = capture_result_from_graph(&value, &mut graph).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)), "{value:?}: {err}");
    }
    let nested = Value::Tuple(vec![Value::Int(1), Value::None]);
    assert!(matches!(
        capture_result_from_graph(&nested, &mut graph),
        Err(Error::TypeMismatch(_))
    ));
}
