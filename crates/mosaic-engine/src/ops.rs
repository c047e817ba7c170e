//! One-shot streamed operations outside the refinement loop: app-idea
//! generation, prompt refinement, and direct error fixing. Each opens a
//! single stream, drains it, and returns cleaned text — no validation, no
//! retries; the caller decides what to do with the result.

use std::pin::pin;

use tokio_stream::StreamExt;
use tracing::{instrument, warn};

use mosaic_core::messages::{GenerationSettings, Message};
use mosaic_llm::provider::ProviderFactory;

use crate::normalize::strip_code_fences;
use crate::orchestrator::EngineError;
use crate::prompts::{IDEA_SYSTEM_PROMPT, IDEA_USER_PROMPT, fix_prompt, refine_user_prompt};

/// Drain one provider stream into a string.
///
/// A mid-stream failure is a premature end: accumulated text is returned.
async fn collect_stream(
    factory: &dyn ProviderFactory,
    model: &str,
    messages: &[Message],
    settings: &GenerationSettings,
) -> Result<String, EngineError> {
    let provider = factory
        .create_for_model(model)
        .await
        .map_err(EngineError::from_provider)?;
    let stream = provider
        .open_stream(messages, settings)
        .await
        .map_err(EngineError::from_provider)?;

    let mut stream = pin!(stream);
    let mut text = String::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(delta) => text.push_str(&delta),
            Err(err) => {
                warn!(error = %err, "stream ended prematurely, keeping accumulated text");
                break;
            }
        }
    }
    Ok(text)
}

/// Generate an app idea ("Build me a … app that …").
#[instrument(skip_all, fields(model = %model))]
pub async fn generate_idea(
    factory: &dyn ProviderFactory,
    model: &str,
    settings: &GenerationSettings,
) -> Result<String, EngineError> {
    let messages = vec![
        Message::system(IDEA_SYSTEM_PROMPT),
        Message::user(IDEA_USER_PROMPT),
    ];
    let idea = collect_stream(factory, model, &messages, settings).await?;
    Ok(idea.trim().to_owned())
}

/// Rewrite a rough user prompt into a sharper, generation-ready one.
#[instrument(skip_all, fields(model = %model))]
pub async fn refine_prompt(
    factory: &dyn ProviderFactory,
    model: &str,
    prompt: &str,
    settings: &GenerationSettings,
) -> Result<String, EngineError> {
    let messages = vec![Message::user(refine_user_prompt(prompt))];
    let refined = collect_stream(factory, model, &messages, settings).await?;
    Ok(refined.trim().to_owned())
}

/// One-shot fix of code with a reported error.
///
/// Returns the cleaned replacement code without entering the refinement
/// loop; the caller validates if it cares.
#[instrument(skip_all, fields(model = %model))]
pub async fn fix_code(
    factory: &dyn ProviderFactory,
    model: &str,
    code: &str,
    error: &str,
    line: Option<u32>,
    column: Option<u32>,
    settings: &GenerationSettings,
) -> Result<String, EngineError> {
    let messages = vec![Message::user(fix_prompt(code, error, line, column))];
    let fixed = collect_stream(factory, model, &messages, settings).await?;
    Ok(strip_code_fences(&fixed).trim().to_owned())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use mosaic_core::messages::ProviderKind;
    use mosaic_llm::flush::FlushPolicy;
    use mosaic_llm::provider::{Provider, ProviderError, ProviderResult, TextDeltaStream};

    struct EchoProvider {
        outputs: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Provider for EchoProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Google
        }
        fn model(&self) -> &str {
            "gemini-1.5-flash"
        }
        fn default_flush_policy(&self) -> FlushPolicy {
            FlushPolicy::PassThrough
        }
        async fn open_stream(
            &self,
            messages: &[Message],
            _settings: &GenerationSettings,
        ) -> ProviderResult<TextDeltaStream> {
            self.prompts
                .lock()
                .unwrap()
                .push(messages.last().unwrap().content.clone());
            let out = self.outputs.lock().unwrap().pop_front().unwrap();
            Ok(Box::pin(futures::stream::iter(vec![Ok(out)])))
        }
    }

    struct EchoFactory(Arc<EchoProvider>);

    #[async_trait]
    impl ProviderFactory for EchoFactory {
        async fn create_for_model(&self, model: &str) -> ProviderResult<Arc<dyn Provider>> {
            if model == "unknown-model" {
                return Err(ProviderError::UnknownModel {
                    model: model.to_owned(),
                });
            }
            Ok(self.0.clone())
        }
    }

    fn factory(outputs: &[&str]) -> (EchoFactory, Arc<EchoProvider>) {
        let provider = Arc::new(EchoProvider {
            outputs: Mutex::new(outputs.iter().map(|s| (*s).to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        });
        (EchoFactory(provider.clone()), provider)
    }

    #[tokio::test]
    async fn idea_is_trimmed() {
        let (factory, _) = factory(&["  Build me a habit tracker app that gamifies streaks \n"]);
        let idea = generate_idea(&factory, "gemini-1.5-flash", &GenerationSettings::default())
            .await
            .unwrap();
        assert_eq!(idea, "Build me a habit tracker app that gamifies streaks");
    }

    #[tokio::test]
    async fn refine_prompt_sends_original_text() {
        let (factory, provider) = factory(&["refined"]);
        let out = refine_prompt(
            &factory,
            "gemini-1.5-flash",
            "a todo app",
            &GenerationSettings::default(),
        )
        .await
        .unwrap();
        assert_eq!(out, "refined");
        assert!(provider.prompts.lock().unwrap()[0].contains("a todo app"));
    }

    #[tokio::test]
    async fn fix_code_strips_fences_and_embeds_position() {
        let (factory, provider) = factory(&["```tsx\nexport default const A = 1;\n```"]);
        let fixed = fix_code(
            &factory,
            "gemini-1.5-flash",
            "const A = ;",
            "SyntaxError: Unexpected token",
            Some(1),
            Some(11),
            &GenerationSettings::default(),
        )
        .await
        .unwrap();
        assert_eq!(fixed, "export default const A = 1;");

        let prompt = provider.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("- Line: 1"));
        assert!(prompt.contains("- Column: 11"));
        assert!(prompt.contains("const A = ;"));
    }

    #[tokio::test]
    async fn unknown_model_rejected() {
        let (factory, _) = factory(&[]);
        let err = generate_idea(&factory, "unknown-model", &GenerationSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RequestRejected(_)));
    }
}
