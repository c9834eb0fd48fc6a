pub mod client;

pub use client::{
    is_no_date_reply, parse_item_reply, GenerativeVisionClient, MockVision, VisionBackend,
    VisionConfig, VisionError, DATE_PROMPT, IDENTIFY_PROMPT, NO_DATE_SENTINEL, UNKNOWN_SENTINEL,
};
