//! Built-in node and directive transforms.

pub mod hoist_static;
pub mod props;
pub mod transform_element;
pub mod transform_expression;
pub mod transform_slot_outlet;
pub mod transform_text;
pub mod utils;
pub mod v_bind;
pub mod v_for;
pub mod v_if;
pub mod v_memo;
pub mod v_model;
pub mod v_on;
pub mod v_once;
pub mod v_show;
pub mod v_slot;
