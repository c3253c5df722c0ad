//! SSZ serialization, merkleization and proof-backed tree views.
#![no_std]
extern crate alloc;

pub mod constants;
pub use constants::*;

pub mod error;
pub use error::*;

pub mod descriptor;
pub use descriptor::*;

pub mod value;
pub use value::*;

pub mod codec;

pub mod merkleization;
pub use merkleization::*;

pub mod gindex;
pub use gindex::{Gindex, PathSegment, get_generalized_index};

pub mod node;
pub use node::*;

pub mod tree;
pub use tree::{node_to_value, value_to_node};

pub mod view;
pub use view::*;

pub mod proof;
pub use proof::*;

pub mod partial;
pub use partial::*;
