// Sentiment scoring: trait-based abstraction with a model-first,
// lexicon-fallback controller.
//
// The SentimentScorer trait defines the interface. OnnxSentimentClassifier
// implements it with a local DistilBERT SST-2 export; VaderScorer implements
// it with the VADER lexicon and is always available. The controller tries the
// model once per run and falls back to VADER for the whole batch on failure.

pub mod controller;
pub mod device;
pub mod download;
pub mod labels;
pub mod lexicon;
pub mod onnx;
pub mod traits;
