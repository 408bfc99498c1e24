//! Inflectional lookup backend (spec §5 "Backend consultation"): a
//! fallback source of inflected forms for a lemma, or for a lemma plus a
//! target tag, used when observed tokens cannot satisfy an agreement or msd
//! constraint. Two implementations: a local compressed blob and a batched
//! HTTP API, grounded on `original_source/cordex/representations/
//! lookup_lexicon.py` and `lookup.py` respectively.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use syncoll_core::{SyncollError, SyncollResult};

/// One inflected form a backend can offer for a lemma.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupForm {
    pub text: String,
    pub msd: String,
    pub frequency: u64,
}

pub trait LookupBackend: Send + Sync {
    /// All known forms of `lemma`, most frequent first.
    fn find_lemma(&self, lemma: &str) -> Option<Vec<LookupForm>>;

    /// The form of `lemma` whose tag is closest to `target_msd`: an exact
    /// match if one exists, else `None`. Recipes fall back to `find_lemma`
    /// for anything looser than an exact tag match.
    fn find_form(&self, lemma: &str, target_msd: &str) -> Option<LookupForm> {
        self.find_lemma(lemma)?.into_iter().find(|f| f.msd == target_msd)
    }
}

/// A lemma -> forms table loaded once from a gzip-compressed JSON blob
/// (the Rust-side equivalent of the original's lzma+pickle lexicon file).
#[derive(Debug, Default)]
pub struct FileLookupBackend {
    table: HashMap<String, Vec<LookupForm>>,
}

impl FileLookupBackend {
    pub fn load(path: &Path) -> SyncollResult<Self> {
        let file = std::fs::File::open(path).map_err(|e| SyncollError::io(format!("opening lookup blob {}", path.display()), e))?;
        let mut decoder = flate2::read::GzDecoder::new(file);
        let mut buf = String::new();
        decoder
            .read_to_string(&mut buf)
            .map_err(|e| SyncollError::io(format!("decompressing lookup blob {}", path.display()), e))?;
        let table: HashMap<String, Vec<LookupForm>> = serde_json::from_str(&buf)
            .map_err(|e| SyncollError::lookup_backend_with_source(format!("invalid lookup blob {}", path.display()), e))?;
        Ok(Self { table })
    }
}

impl LookupBackend for FileLookupBackend {
    fn find_lemma(&self, lemma: &str) -> Option<Vec<LookupForm>> {
        let mut forms = self.table.get(lemma)?.clone();
        forms.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        Some(forms)
    }
}

/// Smallest batch size `HttpLookupBackend` will retry at before giving up
/// (spec §5); mirrors the original's hard floor for the bisection retry.
const MIN_BATCH: usize = 50;
const SEARCH_BATCH: usize = 7500;

#[derive(Serialize)]
struct SearchRequest<'a> {
    lemmas: &'a [String],
}

#[derive(Deserialize)]
struct SearchResponse {
    forms: HashMap<String, Vec<LookupForm>>,
}

/// A batched HTTP lookup backend. Requests are split into pages of
/// [`SEARCH_BATCH`] lemmas; a non-2xx response halves the batch and retries,
/// failing hard once the batch shrinks below [`MIN_BATCH`] (spec §5,
/// `lookup.py::call_api`).
pub struct HttpLookupBackend {
    client: reqwest::blocking::Client,
    endpoint: String,
    cache: std::sync::Mutex<HashMap<String, Vec<LookupForm>>>,
}

impl HttpLookupBackend {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            endpoint: endpoint.into(),
            cache: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Pre-fetches forms for every lemma in `lemmas` so that later
    /// `find_lemma` calls hit the in-memory cache rather than issuing one
    /// HTTP request per lemma (spec §5; `set_representations`'s optional
    /// API pre-batching pass in the original).
    pub fn prefetch(&self, lemmas: &[String]) -> SyncollResult<()> {
        for chunk in lemmas.chunks(SEARCH_BATCH) {
            let batch: Vec<String> = chunk.to_vec();
            self.fetch_batch_with_retry(batch)?;
        }
        Ok(())
    }

    fn fetch_batch_with_retry(&self, mut batch: Vec<String>) -> SyncollResult<()> {
        loop {
            match self.fetch_batch(&batch) {
                Ok(()) => return Ok(()),
                Err(_) if batch.len() > MIN_BATCH => {
                    let half = batch.len() / 2;
                    let tail = batch.split_off(half);
                    self.fetch_batch_with_retry(tail)?;
                    batch.truncate(half);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn fetch_batch(&self, batch: &[String]) -> SyncollResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SearchRequest { lemmas: batch })
            .send()
            .map_err(|e| SyncollError::lookup_backend_with_source("lookup request failed", e))?;
        if !response.status().is_success() {
            return Err(SyncollError::lookup_backend(format!("lookup backend returned {}", response.status())));
        }
        let parsed: SearchResponse = response
            .json()
            .map_err(|e| SyncollError::lookup_backend_with_source("malformed lookup response", e))?;
        let mut cache = self.cache.lock().expect("lookup cache mutex poisoned");
        for (lemma, mut forms) in parsed.forms {
            forms.sort_by(|a, b| b.frequency.cmp(&a.frequency));
            cache.insert(lemma, forms);
        }
        Ok(())
    }
}

impl LookupBackend for HttpLookupBackend {
    fn find_lemma(&self, lemma: &str) -> Option<Vec<LookupForm>> {
        {
            let cache = self.cache.lock().expect("lookup cache mutex poisoned");
            if let Some(forms) = cache.get(lemma) {
                return Some(forms.clone());
            }
        }
        self.fetch_batch_with_retry(vec![lemma.to_string()]).ok()?;
        let cache = self.cache.lock().expect("lookup cache mutex poisoned");
        cache.get(lemma).cloned()
    }
}
