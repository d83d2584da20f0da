use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use tracing::{debug, info};

use super::extractive::{ExtractiveQa, Span};

enum Call {
    Answer { max_answer_len: usize },
    TopK { top_k: usize },
}

/// Request to run the pipeline on the Python thread.
struct PipelineRequest {
    question: String,
    context: String,
    call: Call,
    reply: std::sync::mpsc::Sender<Result<Vec<Span>>>,
}

/// A `transformers` question-answering pipeline living on a dedicated OS
/// thread. The model is loaded once when the thread starts and reused for
/// every request; dropping the handle closes the channel and ends the thread.
pub struct PythonPipeline {
    tx: std::sync::mpsc::Sender<PipelineRequest>,
    model: String,
}

impl PythonPipeline {
    /// Spawn the Python thread and wait until the model has loaded.
    pub async fn spawn(model: &str) -> Result<Self> {
        let (tx, rx) = std::sync::mpsc::channel::<PipelineRequest>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<()>>();
        let model_name = model.to_string();

        std::thread::Builder::new()
            .name("qa-pipeline".to_string())
            .spawn(move || {
                let loaded = Python::with_gil(|py| load_pipeline(py, &model_name).map(Bound::unbind));
                let pipeline = match loaded {
                    Ok(p) => p,
                    Err(e) => {
                        let _ = ready_tx.send(Err(anyhow!(
                            "failed to load QA pipeline '{}': {}",
                            model_name,
                            e
                        )));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                debug!(model = %model_name, "QA pipeline thread ready");

                // Block on the channel without holding the GIL so a reloaded
                // pipeline can start while this one drains.
                while let Ok(req) = rx.recv() {
                    let result = Python::with_gil(|py| run(py, pipeline.bind(py), &req));
                    let _ = req.reply.send(result);
                }

                Python::with_gil(|_py| drop(pipeline));
                debug!(model = %model_name, "QA pipeline thread shutting down");
            })
            .context("Failed to spawn QA pipeline thread")?;

        tokio::task::spawn_blocking(move || {
            ready_rx
                .recv()
                .map_err(|_| anyhow!("QA pipeline thread exited while loading"))?
        })
        .await??;

        info!(model, "QA pipeline loaded");
        Ok(Self {
            tx,
            model: model.to_string(),
        })
    }

    async fn request(&self, question: &str, context: &str, call: Call) -> Result<Vec<Span>> {
        let (reply_tx, reply_rx) = std::sync::mpsc::channel();
        self.tx
            .send(PipelineRequest {
                question: question.to_string(),
                context: context.to_string(),
                call,
                reply: reply_tx,
            })
            .map_err(|_| anyhow!("QA pipeline thread died"))?;

        // Await reply without blocking the tokio runtime
        tokio::task::spawn_blocking(move || {
            reply_rx
                .recv()
                .map_err(|_| anyhow!("QA pipeline reply channel closed"))?
        })
        .await?
    }
}

#[async_trait]
impl ExtractiveQa for PythonPipeline {
    async fn answer(&self, question: &str, context: &str, max_answer_len: usize) -> Result<Span> {
        self.request(question, context, Call::Answer { max_answer_len })
            .await?
            .into_iter()
            .next()
            .context("QA pipeline returned no answer")
    }

    async fn top_k(&self, question: &str, context: &str, top_k: usize) -> Result<Vec<Span>> {
        self.request(question, context, Call::TopK { top_k }).await
    }

    fn name(&self) -> &str {
        &self.model
    }
}

fn load_pipeline<'py>(py: Python<'py>, model: &str) -> PyResult<Bound<'py, PyAny>> {
    let transformers = py.import("transformers")?;
    let kwargs = PyDict::new(py);
    kwargs.set_item("model", model)?;
    kwargs.set_item("tokenizer", model)?;
    transformers
        .getattr("pipeline")?
        .call(("question-answering",), Some(&kwargs))
}

fn run(py: Python<'_>, pipeline: &Bound<'_, PyAny>, req: &PipelineRequest) -> Result<Vec<Span>> {
    let kwargs = PyDict::new(py);
    kwargs.set_item("question", req.question.as_str())?;
    kwargs.set_item("context", req.context.as_str())?;
    match req.call {
        Call::Answer { max_answer_len } => kwargs.set_item("max_answer_len", max_answer_len)?,
        Call::TopK { top_k } => kwargs.set_item("top_k", top_k)?,
    }

    let output = pipeline
        .call((), Some(&kwargs))
        .map_err(|e| anyhow!("QA pipeline call failed: {}", e))?;

    // A single record comes back as a dict, top_k > 1 as a list of dicts
    if let Ok(list) = output.downcast::<PyList>() {
        list.iter()
            .map(|item| span_from_py(&item).map_err(Into::into))
            .collect()
    } else {
        Ok(vec![span_from_py(&output)?])
    }
}

fn span_from_py(obj: &Bound<'_, PyAny>) -> PyResult<Span> {
    Ok(Span {
        answer: obj.get_item("answer")?.extract()?,
        score: obj.get_item("score")?.extract()?,
        start: obj.get_item("start")?.extract()?,
        end: obj.get_item("end")?.extract()?,
    })
}
