//! Datasets and the helpers that materialize native elements into them.

mod dataset;
mod materialize;

pub use dataset::{Dataset, DatasetSource};
pub use materialize::{
    append_to_list_structure_for_element_type_spec, make_data_set_from_elements,
    make_dataset_from_variant_tensor, make_dummy_element_for_type_spec,
    make_empty_list_structure_for_element_type_spec,
    to_tensor_slices_from_list_structure_for_element_type_spec,
};

pub(crate) use dataset::{range_rows, slice_rows};
