//! Fixed prompt templates for the two model calls.

use crate::models::GenerationRequest;

/// Prompt asking the model to describe how the reference post is built.
pub fn analysis_prompt(reference: &str) -> String {
    format!(
        r#"Analyze the following blog post and extract its structure and distinctive features.

Reference post:
{reference}

Analyze each of the following:
1. Title pattern and style
2. How the introduction is built (raising a problem, empathy, sparking curiosity, etc.)
3. Number of body sections and the structure of each section
4. Subheading style and pattern
5. Paragraph length and how paragraphs are put together
6. How the post concludes (summary, call to action, question, etc.)
7. Characteristic voice markers (sentence length, tone, keyword usage, etc.)
8. Overall tone and manner of the post

Be specific for every item, then summarize the key elements needed to reproduce this style.

Begin the analysis with a line of the form `Language: <language>` naming the language the post is written in, and write the whole analysis in that same language."#
    )
}

/// Prompt asking the model to write a new post that borrows only the
/// structure and voice described by `analysis`.
pub fn composition_prompt(analysis: &str, request: &GenerationRequest) -> String {
    let topic = &request.topic;
    let keywords = request.keywords_line();
    let requirements = request.requirements.as_deref().unwrap_or("none");
    format!(
        r#"You are an expert writer of brand blog content.

# Analysis of the reference post
{analysis}

# New post request
- Topic: {topic}
- Target keywords: {keywords}
- Additional requirements: {requirements}

Using the analysis above, write a completely new blog post on the new topic, **borrowing only the structure and style**.

Strictly forbidden:
- Copying sentences from the reference post, or lightly rewording them
- Reusing specific expressions or phrases from the reference
- Using examples or cases similar to the ones in the reference

Required:
1. **Structure**: follow only the overall structure of the reference (introduction, body, conclusion; number of sections)
2. **Title and subheadings**: follow only their format (question, numbered list, etc.) and write entirely new sentences
3. **Voice and tone**: imitate only the tone (friendly, expert, etc.) and the rhythm of sentence lengths
4. **Content**: write entirely new content, examples and evidence that fit the topic
5. **Keywords**: work {keywords} in naturally
6. **Originality**: it must read as if written by someone who never saw the reference

How to write:
- Learn only *how* the reference was written (structure, style)
- Ignore *what* it says (specific content, sentences) entirely
- Fill the post with original material about {topic}
- Write in the language named on the `Language:` line of the analysis, which is the language of the reference post

Output only the finished blog post, with no analysis or commentary."#
    )
}
