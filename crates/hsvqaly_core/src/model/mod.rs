mod component;
mod ids;
mod sex;

pub use component::{Component, ComponentMap, components, merge_weighted};
pub use ids::NodeId;
pub use sex::{FEMALE_BIRTH_RATIO, MALE_BIRTH_RATIO, Sex};
