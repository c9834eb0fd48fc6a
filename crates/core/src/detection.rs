use serde::{Deserialize, Serialize};

use super::geometry::BoundingBox;

/// Class labels from the detection oracle that count as food or food
/// packaging for reporting purposes.
const FOOD_LABELS: &[&str] = &[
    "apple",
    "banana",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "sandwich",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
];

/// One region the detection oracle reported in a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
    pub is_food_related: bool,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bounding_box: BoundingBox) -> Detection {
        let label = label.into();
        let is_food_related = Detection::is_food_label(&label);
        Detection {
            label,
            confidence: confidence.clamp(0.0, 1.0),
            bounding_box,
            is_food_related,
        }
    }

    pub fn is_food_label(label: &str) -> bool {
        let label = label.to_lowercase();
        FOOD_LABELS.contains(&label.as_str())
    }
}
