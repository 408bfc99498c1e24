//! Corpus readers (TEI-XML, CoNLL-U), file-discovery loop and the tabular
//! collocation writer (spec §6 "External interfaces").

pub mod conllu;
pub mod loader;
pub mod tei;
pub mod writer;

pub use loader::{discover_files, load_sentences, load_sentences_with_options, CorpusFormat};
pub use writer::{write_rows, OutputRow, SentenceMapEntry, Writer, WriterConfig};
