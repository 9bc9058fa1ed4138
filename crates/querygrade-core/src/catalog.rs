use crate::errors::ConfigError;
use crate::model::{Exercise, ExerciseView};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

pub const SUPPORTED_CATALOG_VERSION: u32 = 1;

/// Below this Jaro-Winkler similarity no "did you mean" is offered.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Accepted on-disk shapes: a bare list, or a versioned document.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Versioned {
        version: u32,
        exercises: Vec<Exercise>,
    },
    Bare(Vec<Exercise>),
}

/// Immutable, ordered set of exercises loaded once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    exercises: Vec<Exercise>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ConfigError(format!("failed to read catalog {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_str(&raw)
            .map_err(|e| ConfigError(format!("{} (file: {})", e.0, path.display())))?;
        tracing::info!(
            event = "catalog_loaded",
            file = %path.display(),
            exercises = catalog.len()
        );
        Ok(catalog)
    }

    /// Parses YAML or JSON catalog text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(raw: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = serde_yaml::from_str(raw)
            .map_err(|e| ConfigError(format!("failed to parse catalog: {}", e)))?;
        let exercises = match file {
            CatalogFile::Bare(list) => list,
            CatalogFile::Versioned { version, exercises } => {
                if version != SUPPORTED_CATALOG_VERSION {
                    return Err(ConfigError(format!(
                        "unsupported catalog version {} (supported: {})",
                        version, SUPPORTED_CATALOG_VERSION
                    )));
                }
                exercises
            }
        };
        Self::from_exercises(exercises)
    }

    pub fn from_exercises(exercises: Vec<Exercise>) -> Result<Self, ConfigError> {
        if exercises.is_empty() {
            return Err(ConfigError("catalog contains no exercises".into()));
        }
        let mut seen = HashSet::new();
        for ex in &exercises {
            if ex.id.trim().is_empty() {
                return Err(ConfigError(format!(
                    "exercise `{}` has an empty id",
                    ex.title
                )));
            }
            if !seen.insert(ex.id.as_str()) {
                return Err(ConfigError(format!("duplicate exercise id `{}`", ex.id)));
            }
            if ex.solution_sql.trim().is_empty() {
                return Err(ConfigError(format!(
                    "exercise `{}` has an empty solutionSql",
                    ex.id
                )));
            }
        }
        Ok(Self { exercises })
    }

    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    /// Exercises in file order.
    pub fn list(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Positional successor of `id`; `None` for the last or an unknown id.
    pub fn next_id(&self, id: &str) -> Option<&str> {
        let pos = self.exercises.iter().position(|e| e.id == id)?;
        self.exercises.get(pos + 1).map(|e| e.id.as_str())
    }

    pub fn public_view(&self, id: &str) -> Option<ExerciseView> {
        self.get(id).map(ExerciseView::from)
    }

    pub fn solution(&self, id: &str) -> Option<&str> {
        self.get(id).map(|e| e.solution_sql.as_str())
    }

    pub fn closest_id(&self, id: &str) -> Option<&str> {
        self.exercises
            .iter()
            .map(|e| (strsim::jaro_winkler(id, &e.id), e.id.as_str()))
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Difficulty;

    const BARE: &str = r#"[
      {"id": "movies-1999", "title": "Movies of 1999", "description": "d",
       "difficulty": "easy", "tables": ["basics"],
       "solutionSql": "select tconst from basics where startyear = 1999"},
      {"id": "top-rated", "title": "Top rated", "description": "d",
       "difficulty": "medium", "starterSql": "select ",
       "solutionSql": "select tconst from ratings order by averagerating desc"}
    ]"#;

    #[test]
    fn bare_json_list_keeps_file_order() {
        let c = Catalog::from_str(BARE).unwrap();
        let ids: Vec<_> = c.list().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["movies-1999", "top-rated"]);
        assert_eq!(c.get("top-rated").unwrap().difficulty, Difficulty::Medium);
        assert_eq!(c.next_id("movies-1999"), Some("top-rated"));
        assert_eq!(c.next_id("top-rated"), None);
        assert_eq!(c.next_id("missing"), None);
    }

    #[test]
    fn versioned_yaml_document() {
        let yaml = r#"
version: 1
exercises:
  - id: count-titles
    title: Count titles
    description: How many titles are there?
    difficulty: easy
    solutionSql: select count(*) as n from basics
"#;
        let c = Catalog::from_str(yaml).unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(
            c.solution("count-titles"),
            Some("select count(*) as n from basics")
        );
        let view = c.public_view("count-titles").unwrap();
        assert!(view.tables.is_empty());
        assert!(view.starter_sql.is_none());
    }

    #[test]
    fn rejects_duplicates_and_empty_solutions() {
        let dup = r#"[
          {"id": "a", "title": "t", "description": "d", "difficulty": "easy", "solutionSql": "select 1"},
          {"id": "a", "title": "t", "description": "d", "difficulty": "easy", "solutionSql": "select 2"}
        ]"#;
        let err = Catalog::from_str(dup).unwrap_err();
        assert!(err.0.contains("duplicate exercise id `a`"));

        let empty = r#"[{"id": "a", "title": "t", "description": "d", "difficulty": "easy", "solutionSql": "  "}]"#;
        assert!(Catalog::from_str(empty).is_err());
        assert!(Catalog::from_str("[]").is_err());
        assert!(Catalog::from_str("version: 2\nexercises: []\n").is_err());
    }

    #[test]
    fn suggests_a_close_id() {
        let c = Catalog::from_str(BARE).unwrap();
        assert_eq!(c.closest_id("movies-199"), Some("movies-1999"));
        assert_eq!(c.closest_id("zzz"), None);
    }
}
