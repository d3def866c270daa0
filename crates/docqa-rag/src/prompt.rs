//! Prompt templates for answer generation

/// Prompt used when retrieval found relevant passages
pub fn document_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an AI assistant that answers questions based on provided documents and your general knowledge.\n\
         \n\
         Based on the following document context, answer the user's question. If the documents provide relevant information, use that information. If the documents don't contain enough information or the question is about general knowledge, you can also use your general knowledge to provide a comprehensive answer.\n\
         \n\
         Document Context:\n\
         {context}\n\
         \n\
         Question: {question}\n\
         \n\
         Answer: Please provide a helpful and accurate answer. If you're using information from the documents, mention that. If you're using general knowledge, you can mention that as well.\n"
    )
}

/// Prompt used when no stored passage is relevant to the question
pub fn general_prompt(question: &str) -> String {
    format!(
        "You are a helpful AI assistant. The user is asking a question that doesn't seem to be related to any specific documents in your knowledge base.\n\
         \n\
         Question: {question}\n\
         \n\
         Answer: Please provide a helpful and accurate answer using your general knowledge. Be informative and comprehensive in your response.\n"
    )
}
