//! Question answering over the document store

use std::sync::Arc;

use docqa_core::{Answer, Error, LLMProvider, Result};

use crate::context::ContextAssembler;
use crate::prompt;
use crate::retriever::{Retrieval, Retriever};

/// Retrieves context for a question and asks the LLM.
///
/// Falls back to a general-knowledge prompt when nothing relevant is stored.
pub struct QuestionAnswerer {
    retriever: Retriever,
    assembler: ContextAssembler,
    llm: Arc<dyn LLMProvider>,
}

impl QuestionAnswerer {
    pub fn new(retriever: Retriever, assembler: ContextAssembler, llm: Arc<dyn LLMProvider>) -> Self {
        Self {
            retriever,
            assembler,
            llm,
        }
    }

    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("question must not be empty".to_string()));
        }

        let (prompt, sources) = match self.retriever.retrieve_default(question).await {
            Retrieval::Relevant(passages) => {
                tracing::info!("Answering from {} relevant passage(s)", passages.len());
                let assembled = self.assembler.assemble(&passages);
                (
                    prompt::document_prompt(&assembled.context, question),
                    assembled.sources,
                )
            }
            Retrieval::NoRelevantDocuments => {
                tracing::info!("No relevant documents, answering from general knowledge");
                (prompt::general_prompt(question), Vec::new())
            }
        };

        tracing::debug!("Sending prompt to {}", self.llm.model_id());
        let response = self.llm.complete(&prompt).await?;

        Ok(Answer { response, sources })
    }
}
