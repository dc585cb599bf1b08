//! Shared test utilities for plugforge integration tests.
//!
//! Provides a scripted [`Generator`] whose responses are keyed by target
//! path, so tests can exercise retries, failures, and blocked propagation
//! deterministically without an external backend.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use plugforge_core::generator::{GenerateError, GenerateRequest, Generator};
use plugforge_core::plan::{feature_class_name, main_class_name};
use plugforge_core::spec::ProjectSpec;

/// One scripted backend response for a path.
#[derive(Debug, Clone)]
pub enum Response {
    /// Return this content.
    Content(String),
    /// Fail the attempt as if the backend errored.
    Error(String),
}

/// A [`Generator`] that replays scripted responses per path and records
/// every prompt it receives.
///
/// Responses for a path are consumed front to back; once the queue is
/// empty, the generator falls back to well-formed default content so
/// unscripted paths complete cleanly.
pub struct ScriptedGenerator {
    project_name: String,
    responses: Mutex<HashMap<String, VecDeque<Response>>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    /// A generator producing well-formed defaults for the given spec.
    pub fn for_spec(spec: &ProjectSpec) -> Self {
        Self {
            project_name: spec.name.trim().to_owned(),
            responses: Mutex::new(HashMap::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a scripted response for a path. Responses are consumed in
    /// queue order, one per attempt.
    pub fn script(self, path: &str, response: Response) -> Self {
        self.responses
            .lock()
            .expect("responses lock poisoned")
            .entry(path.to_owned())
            .or_default()
            .push_back(response);
        self
    }

    /// All `(path, prompt)` pairs received so far, in call order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().expect("prompts lock poisoned").clone()
    }

    /// Prompts received for one path, in call order.
    pub fn prompts_for(&self, path: &str) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|(p, _)| p == path)
            .map(|(_, prompt)| prompt)
            .collect()
    }

    /// Well-formed default content for a request, matching what the
    /// validation battery expects of each kind.
    fn default_content(&self, request: &GenerateRequest) -> String {
        use plugforge_core::spec::FileKind;
        match request.kind {
            FileKind::Manifest => format!(
                "name: {name}\n\
                 version: 1.0.0\n\
                 main: com.example.{lower}.{main}\n\
                 api-version: 1.21\n\
                 description: generated plugin scaffold\n",
                name = self.project_name,
                lower = self.project_name.to_ascii_lowercase(),
                main = main_class_name(&self.project_name),
            ),
            FileKind::MainClass | FileKind::Feature => format!(
                "import java.util.HashMap;\n\
                 import java.util.Map;\n\
                 \n\
                 public class {symbol} {{\n\
                 \n\
                 \x20   private final Map<String, String> settings = new HashMap<>();\n\
                 \n\
                 \x20   public void register() {{\n\
                 \x20       settings.put(\"enabled\", \"true\");\n\
                 \x20   }}\n\
                 \n\
                 \x20   public void unregister() {{\n\
                 \x20       settings.clear();\n\
                 \x20   }}\n\
                 \n\
                 \x20   public boolean isEnabled() {{\n\
                 \x20       return \"true\".equals(settings.get(\"enabled\"));\n\
                 \x20   }}\n\
                 \n\
                 \x20   public String describe() {{\n\
                 \x20       return \"{symbol} with \" + settings.size() + \" settings\";\n\
                 \x20   }}\n\
                 }}\n",
                symbol = request.expected_symbol,
            ),
            FileKind::Config => {
                "enabled: true\nmax-uses: 3\ncooldown-seconds: 30\nmessages:\n  denied: no permission\n"
                    .to_owned()
            }
            FileKind::Resource => "placeholder resource contents for generated plugins\n".to_owned(),
        }
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, GenerateError> {
        self.prompts
            .lock()
            .expect("prompts lock poisoned")
            .push((request.path.clone(), request.prompt.clone()));

        let scripted = self
            .responses
            .lock()
            .expect("responses lock poisoned")
            .get_mut(&request.path)
            .and_then(VecDeque::pop_front);

        match scripted {
            Some(Response::Content(content)) => Ok(content),
            Some(Response::Error(message)) => Err(GenerateError::Backend {
                exit: "1".to_owned(),
                stderr: message,
            }),
            None => Ok(self.default_content(request)),
        }
    }
}

/// A small spec most integration tests start from.
pub fn sample_spec() -> ProjectSpec {
    ProjectSpec::new("Homes", "a plugin for setting and visiting player homes")
        .features(vec!["set home".to_owned(), "visit home".to_owned()])
}

/// The derived feature class path for a feature description.
pub fn feature_path(feature: &str) -> String {
    format!("{}.java", feature_class_name(feature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugforge_core::spec::FileKind;
    use uuid::Uuid;

    fn request(path: &str, kind: FileKind, symbol: &str) -> GenerateRequest {
        GenerateRequest {
            task_id: Uuid::new_v4(),
            path: path.to_owned(),
            kind,
            expected_symbol: symbol.to_owned(),
            attempt: 1,
            prompt: "p".to_owned(),
        }
    }

    #[tokio::test]
    async fn defaults_are_well_formed() {
        let generator = ScriptedGenerator::for_spec(&sample_spec());
        let manifest = generator
            .generate(&request("plugin.yml", FileKind::Manifest, "Homes"))
            .await
            .unwrap();
        assert!(manifest.contains("name: Homes"));
        assert!(manifest.contains("main: com.example.homes.HomesPlugin"));

        let class = generator
            .generate(&request("SetHomeFeature.java", FileKind::Feature, "SetHomeFeature"))
            .await
            .unwrap();
        assert!(class.contains("public class SetHomeFeature"));
    }

    #[tokio::test]
    async fn scripted_responses_consumed_in_order() {
        let generator = ScriptedGenerator::for_spec(&sample_spec())
            .script("A.java", Response::Content("first".into()))
            .script("A.java", Response::Error("backend down".into()));

        let req = request("A.java", FileKind::Feature, "A");
        assert_eq!(generator.generate(&req).await.unwrap(), "first");
        assert!(generator.generate(&req).await.is_err());
        // Queue drained: falls back to default content.
        assert!(generator.generate(&req).await.is_ok());
    }

    #[tokio::test]
    async fn prompts_are_recorded_per_path() {
        let generator = ScriptedGenerator::for_spec(&sample_spec());
        let req = request("A.java", FileKind::Feature, "A");
        generator.generate(&req).await.unwrap();
        generator.generate(&req).await.unwrap();
        assert_eq!(generator.prompts_for("A.java").len(), 2);
        assert!(generator.prompts_for("B.java").is_empty());
    }
}
