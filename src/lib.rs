//! # Scan It Know It
//!
//! A product-label scanning service: OCR a photo of a label, identify the
//! product, extract its ingredient and nutrition panels, rate ingredient
//! safety, summarise crowd reviews and answer follow-up questions.

pub mod api;
pub mod cache;
pub mod chat;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod field_extractor;
pub mod ingredient_classifier;
pub mod ingredient_model;
pub mod ingredient_parser;
pub mod llm;
pub mod localization;
pub mod measurement_patterns;
pub mod nutrition_parser;
pub mod ocr;
pub mod ocr_config;
pub mod ocr_errors;
pub mod pipeline;
pub mod product_identifier;
pub mod reddit;
pub mod retry;
pub mod review_synthesizer;
pub mod state;
pub mod text_processing;
