use serde_json::Value;

use crate::output::{self, InspectionNode};

use super::engine::EngineHostSession;
use super::error::{EngineError, EngineResult};
use super::run::CommandRunner;

/// Container enumeration through `docker ps` and `docker inspect`.
pub struct ContainerQuery<'a, R: CommandRunner> {
    session: &'a EngineHostSession<R>,
}

impl<'a, R: CommandRunner> ContainerQuery<'a, R> {
    pub fn new(session: &'a EngineHostSession<R>) -> Self {
        Self { session }
    }

    /// Full container ids, running only unless `all` is set.
    pub fn list_container_ids(
        &self,
        all: bool,
        id_filter: Option<&dyn Fn(&str) -> bool>,
    ) -> EngineResult<Vec<String>> {
        let mut args = vec!["ps".to_string(), "-q".to_string(), "--no-trunc=true".to_string()];
        if all {
            args.push("-a".to_string());
        }

        let listing = self.session.run_engine_silent(&args)?;
        Ok(listing
            .lines()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .filter(|id| id_filter.is_none_or(|keep| keep(id)))
            .map(str::to_string)
            .collect())
    }

    /// Ids whose `docker inspect` document passes `filter`.
    ///
    /// Issues one inspect call per listed container.
    pub fn list_container_ids_by_inspection(
        &self,
        all: bool,
        filter: Option<&dyn Fn(&InspectionNode) -> bool>,
    ) -> EngineResult<Vec<String>> {
        let ids = self.list_container_ids(all, None)?;
        let Some(filter) = filter else {
            return Ok(ids);
        };

        let mut kept = Vec::with_capacity(ids.len());
        for id in ids {
            let args = vec!["inspect".to_string(), id.clone()];
            let inspected = self.session.run_engine_json(&args)?;
            let document = output::first_element(&inspected).ok_or_else(|| {
                EngineError::malformed(format!("docker inspect {id}"), "expected a non-empty JSON array")
            })?;
            if filter(document) {
                kept.push(id);
            }
        }
        Ok(kept)
    }

    /// Ids whose `Config.Image` passes `filter`; containers without an image
    /// name never match.
    pub fn list_container_ids_by_image_name(
        &self,
        all: bool,
        filter: Option<&dyn Fn(&str) -> bool>,
    ) -> EngineResult<Vec<String>> {
        match filter {
            None => self.list_container_ids_by_inspection(all, None),
            Some(filter) => {
                let by_image = |document: &InspectionNode| {
                    output::lookup_dotted(document, "Config.Image")
                        .and_then(Value::as_str)
                        .is_some_and(filter)
                };
                self.list_container_ids_by_inspection(all, Some(&by_image))
            }
        }
    }
}

/// Case-insensitive prefix match on image names.
pub fn image_prefix_filter(prefix: &str) -> impl Fn(&str) -> bool + use<> {
    let prefix = prefix.to_lowercase();
    move |image: &str| image.to_lowercase().starts_with(&prefix)
}
