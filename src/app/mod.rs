pub mod analyze_use_case;
pub mod clean_use_case;
