use anyhow::Result;
use fedgraph::data::{
    append_to_list_structure_for_element_type_spec, make_data_set_from_elements,
    make_dataset_from_variant_tensor, make_dummy_element_for_type_spec,
    make_empty_list_structure_for_element_type_spec,
    to_tensor_slices_from_list_structure_for_element_type_spec,
};
use fedgraph::graph::Op;
use fedgraph::{
    ContainerKind, DType, Error, Graph, HostTensor, Session, Shape, Structure, Type, Value,
};

fn int_rows(rows: &[Structure<HostTensor>]) -> Vec<Vec<i32>> {
    rows.iter()
        .map(|row| {
            let leaf = row.as_leaf().expect("tensor row");
            leaf.as_array::<i32>()
                .expect("int32 row")
                .iter()
                .copied()
                .collect()
        })
        .collect()
}

fn container_of<T>(structure: &Structure<T>) -> Option<&ContainerKind> {
    match structure {
        Structure::Tuple { container, .. } => container.as_ref(),
        Structure::Leaf(_) => None,
    }
}

#[test]
fn empty_list_structure_follows_naming() -> Result<()> {
    let named = make_empty_list_structure_for_element_type_spec("<a=int32,b=<c=bool>>")?;
    assert_eq!(container_of(&named), Some(&ContainerKind::OrderedDict));
    assert_eq!(
        container_of(named.field("b").expect("b")),
        Some(&ContainerKind::OrderedDict)
    );
    assert!(named.leaves().iter().all(|leaf| leaf.is_empty()));

    let unnamed = make_empty_list_structure_for_element_type_spec("<int32,bool>")?;
    assert_eq!(container_of(&unnamed), Some(&ContainerKind::Tuple));

    let empty = make_empty_list_structure_for_element_type_spec("<>")?;
    assert_eq!(container_of(&empty), Some(&ContainerKind::OrderedDict));

    assert!(matches!(
        make_empty_list_structure_for_element_type_spec("<a=int32*>"),
        Err(Error::TypeMismatch(_))
    ));
    Ok(())
}

#[test]
fn append_checks_keys_and_arity() -> Result<()> {
    let ty: Type = "<a=int32,b=float32[2]>".parse()?;
    let mut structure = make_empty_list_structure_for_element_type_spec(&ty)?;

    append_to_list_structure_for_element_type_spec(&mut structure, &Value::None, &ty)?;
    assert!(structure.leaves().iter().all(|leaf| leaf.is_empty()));

    let element = Value::OrderedDict(vec![
        ("b".to_string(), Value::List(vec![Value::Float(1.0), Value::Int(2)])),
        ("a".to_string(), Value::Int(7)),
    ]);
    append_to_list_structure_for_element_type_spec(&mut structure, &element, &ty)?;
    let positional = Value::Tuple(vec![
        Value::Int(8),
        Value::Array(HostTensor::from_vec(vec![3.0f32, 4.0])),
    ]);
    append_to_list_structure_for_element_type_spec(&mut structure, &positional, &ty)?;
    assert_eq!(structure.field("a").and_then(Structure::as_leaf).map(Vec::len), Some(2));

    let wrong_keys = Value::OrderedDict(vec![
        ("a".to_string(), Value::Int(1)),
        ("c".to_string(), Value::Int(2)),
    ]);
    assert!(matches!(
        append_to_list_structure_for_element_type_spec(&mut structure, &wrong_keys, &ty),
        Err(Error::TypeMismatch(_))
    ));
    let short = Value::Tuple(vec![Value::Int(1)]);
    assert!(matches!(
        append_to_list_structure_for_element_type_spec(&mut structure, &short, &ty),
        Err(Error::TypeMismatch(_))
    ));
    let text = Value::Tuple(vec![Value::from("x"), Value::Int(1)]);
    assert!(matches!(
        append_to_list_structure_for_element_type_spec(&mut structure, &text, &ty),
        Err(Error::TypeMismatch(_))
    ));

    let slices = to_tensor_slices_from_list_structure_for_element_type_spec(structure, &ty)?;
    let a = slices.field("a").and_then(Structure::as_leaf).expect("a");
    let b = slices.field("b").and_then(Structure::as_leaf).expect("b");
    assert_eq!(a.dims(), &[2]);
    assert_eq!(a.dtype(), DType::I32);
    assert_eq!(b.dims(), &[2, 2]);
    assert_eq!(b.to_f64_vec(), Some(vec![1.0, 2.0, 3.0, 4.0]));
    Ok(())
}

#[test]
fn empty_accumulators_slice_to_zero_rows() -> Result<()> {
    let structure = make_empty_list_structure_for_element_type_spec((DType::F32, [Some(10usize)]))?;
    let slices =
        to_tensor_slices_from_list_structure_for_element_type_spec(structure, (DType::F32, [Some(10usize)]))?;
    assert_eq!(slices.as_leaf().map(HostTensor::dims), Some(&[0, 10][..]));
    Ok(())
}

#[test]
fn dummy_element_zeroes_dynamic_dims() -> Result<()> {
    let dummy = make_dummy_element_for_type_spec("float32[?,10]")?;
    let leaf = dummy.as_leaf().expect("tensor");
    assert_eq!(leaf.dims(), &[0, 10]);

    let tuple = make_dummy_element_for_type_spec("<x=int32[2],y=string>")?;
    let x = tuple.field("x").and_then(Structure::as_leaf).expect("x");
    assert_eq!(x.to_f64_vec(), Some(vec![0.0, 0.0]));
    assert_eq!(tuple.field("y").and_then(Structure::as_leaf).map(HostTensor::dtype), Some(DType::String));
    Ok(())
}

#[test]
fn no_elements_give_an_empty_dataset() -> Result<()> {
    let dataset = make_data_set_from_elements(None, &[], "float32[?,10]")?;
    assert!(dataset.is_eager());
    assert_eq!(dataset.element_type().to_string(), "float32[0,10]");

    let mut graph = Graph::new();
    let dataset = make_data_set_from_elements(Some(&mut graph), &[], DType::I32)?;
    let variant = dataset.variant_tensor().expect("graph dataset");
    assert_eq!(variant.op(), Op::TakeDataset);
    assert!(Session::new(&graph).dataset_rows(&dataset)?.is_empty());
    Ok(())
}

#[test]
fn no_elements_of_a_tuple_type_keep_declared_dims() -> Result<()> {
    let mut graph = Graph::new();
    let element_type = vec![
        Type::tensor(DType::F32, Shape::from_partial(&[None, Some(10)])),
        Type::tensor(DType::F32, Shape::from_partial(&[None, Some(5)])),
    ];
    let dataset = make_data_set_from_elements(Some(&mut graph), &[], element_type)?;
    assert_eq!(
        dataset.element_type().to_string(),
        "<float32[0,10],float32[0,5]>"
    );
    assert!(Session::new(&graph).dataset_rows(&dataset)?.is_empty());
    Ok(())
}

#[test]
fn leafless_elements_still_count_as_rows() -> Result<()> {
    let mut graph = Graph::new();
    let elements = vec![Value::OrderedDict(Vec::new()); 3];
    let dataset = make_data_set_from_elements(Some(&mut graph), &elements, "<>")?;
    let session = Session::new(&graph);
    assert_eq!(session.dataset_rows(&dataset)?.len(), 3);
    let Value::List(rows) = session.fetch_value(&Value::Dataset(dataset))? else {
        panic!("datasets fetch as lists");
    };
    assert!(rows
        .iter()
        .all(|row| matches!(row, Value::OrderedDict(fields) if fields.is_empty())));

    let nested = vec![Value::Tuple(vec![Value::OrderedDict(Vec::new())]); 2];
    let dataset = make_data_set_from_elements(None, &nested, "<<>>")?;
    let rows = session.dataset_rows(&dataset)?;
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].to_value()?,
        Value::Tuple(vec![Value::OrderedDict(Vec::new())])
    );
    Ok(())
}

#[test]
fn empty_lists_are_zero_length_vectors() -> Result<()> {
    let elements = [
        Value::List(vec![Value::Int(1), Value::Int(2)]),
        Value::List(Vec::new()),
    ];
    let dataset = make_data_set_from_elements(None, &elements, "int32[?]")?;
    assert_eq!(dataset.element_type().to_string(), "int32[?]");
    let graph = Graph::new();
    let rows = Session::new(&graph).dataset_rows(&dataset)?;
    assert_eq!(int_rows(&rows), [vec![1, 2], vec![]]);
    Ok(())
}

#[test]
fn elements_keep_their_order() -> Result<()> {
    let mut graph = Graph::new();
    let elements = [Value::Int(1), Value::Int(2), Value::Int(3)];
    let dataset = make_data_set_from_elements(Some(&mut graph), &elements, DType::I32)?;
    assert_eq!(dataset.element_type(), &Type::scalar(DType::I32));
    assert_eq!(
        dataset.variant_tensor().map(|variant| variant.op()),
        Some(Op::ConcatenateDataset)
    );
    let rows = Session::new(&graph).dataset_rows(&dataset)?;
    assert_eq!(int_rows(&rows), [vec![1], vec![2], vec![3]]);

    let single = make_data_set_from_elements(None, &[Value::Int(5)], DType::I32)?;
    let rows = Session::new(&graph).dataset_rows(&single)?;
    assert_eq!(int_rows(&rows), [vec![5]]);
    Ok(())
}

#[test]
fn short_last_batch_relaxes_the_leading_dim() -> Result<()> {
    let batch = |values: Vec<i32>| Value::Array(HostTensor::from_vec(values));
    let elements = [batch(vec![1, 2]), batch(vec![3, 4]), batch(vec![5])];
    let dataset = make_data_set_from_elements(None, &elements, (DType::I32, [None::<usize>]))?;
    assert_eq!(dataset.element_type().to_string(), "int32[?]");
    let graph = Graph::new();
    let rows = Session::new(&graph).dataset_rows(&dataset)?;
    assert_eq!(int_rows(&rows), [vec![1, 2], vec![3, 4], vec![5]]);
    Ok(())
}

#[test]
fn ragged_elements_fall_back_to_one_segment_each() -> Result<()> {
    let mut graph = Graph::new();
    let batch = |values: Vec<i32>| Value::Array(HostTensor::from_vec(values));
    let elements = [batch(vec![1, 2, 3]), batch(vec![4, 5]), batch(vec![6])];
    let dataset = make_data_set_from_elements(Some(&mut graph), &elements, "int32[?]")?;
    assert_eq!(dataset.element_type().to_string(), "int32[?]");
    let rows = Session::new(&graph).dataset_rows(&dataset)?;
    assert_eq!(int_rows(&rows), [vec![1, 2, 3], vec![4, 5], vec![6]]);
    let slice_nodes = graph
        .to_graph_def()
        .node
        .iter()
        .filter(|node| node.op == Op::TensorSliceDataset.as_str())
        .count();
    assert_eq!(slice_nodes, 3);
    Ok(())
}

#[test]
fn structured_elements_round_trip_through_a_session() -> Result<()> {
    let mut graph = Graph::new();
    let element = |a: i64, b: f64| {
        Value::OrderedDict(vec![
            ("a".to_string(), Value::Int(a)),
            ("b".to_string(), Value::Float(b)),
        ])
    };
    let elements = [element(1, 0.5), element(2, 1.5)];
    let dataset = make_data_set_from_elements(Some(&mut graph), &elements, "<a=int32,b=float32>")?;
    let fetched = Session::new(&graph).fetch_value(&Value::Dataset(dataset))?;
    let Value::List(rows) = fetched else {
        panic!("expected a list of rows");
    };
    assert_eq!(rows.len(), 2);
    let second_a = rows[1].field("a").and_then(Value::as_array).expect("a");
    assert_eq!(second_a.as_array::<i32>().map(|view| view.iter().copied().collect::<Vec<_>>()), Some(vec![2]));
    assert!(matches!(rows[0], Value::OrderedDict(_)));
    Ok(())
}

#[test]
fn mismatched_elements_are_rejected() {
    let too_long = [Value::Array(HostTensor::from_vec(vec![1i32, 2, 3]))];
    assert!(matches!(
        make_data_set_from_elements(None, &too_long, (DType::I32, [Some(2usize)])),
        Err(Error::TypeMismatch(_))
    ));
    assert!(matches!(
        make_data_set_from_elements(None, &[Value::from("x")], DType::I32),
        Err(Error::TypeMismatch(_))
    ));
    assert!(matches!(
        make_data_set_from_elements(None, &[Value::Int(1)], "int32*"),
        Err(Error::TypeMismatch(_))
    ));
}

#[test]
fn variant_tensors_wrap_into_datasets() -> Result<()> {
    let mut graph = Graph::new();
    let variant = graph.placeholder("ds", DType::Variant, Shape::scalar())?;
    let dataset = make_dataset_from_variant_tensor(&variant, "<x=int32>")?;
    assert_eq!(dataset.element_type().to_string(), "<x=int32>");

    let plain = graph.placeholder("x", DType::I32, Shape::scalar())?;
    assert!(matches!(
        make_dataset_from_variant_tensor(&plain, DType::I32),
        Err(Error::GraphReference(_))
    ));
    assert!(matches!(
        make_dataset_from_variant_tensor(&variant, "nonsense"),
        Err(Error::TypeMismatch(_))
    ));
    Ok(())
}
