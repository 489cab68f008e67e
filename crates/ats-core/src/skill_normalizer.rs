use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use unicode_normalization::UnicodeNormalization;

/// Builtin alias list: canonical skill -> accepted spellings.
///
/// NOTE: keep in sync with the framework table in `evidence.rs` when adding
/// new canonical skills.
static BUILTIN_ALIASES: &[(&str, &[&str])] = &[
    // Languages
    (
        "javascript",
        &["js", "java script", "ecmascript", "es6", "es2015", "es2016", "es2017"],
    ),
    ("typescript", &["ts", "type script"]),
    ("python", &["py", "python3", "python 3", "python2.7"]),
    ("java", &["java8", "java11", "java17", "openjdk", "oracle java"]),
    ("csharp", &["c#", "c sharp", ".net", "dotnet", "asp.net"]),
    ("cplusplus", &["c++", "cpp", "c plus plus"]),
    ("golang", &["go", "go lang"]),
    ("rust", &["rust lang", "rust language"]),
    ("php", &["php7", "php8", "hypertext preprocessor"]),
    ("ruby", &["ruby lang", "ruby language"]),
    ("rails", &["ruby on rails", "ror"]),
    ("swift", &["swift lang", "ios swift"]),
    ("kotlin", &["kotlin lang", "kotlin jvm"]),
    // Frontend
    ("react", &["reactjs", "react.js", "react js", "react16", "react17", "react18"]),
    ("vue", &["vue.js", "vuejs", "vue js", "vue2", "vue3"]),
    ("angular", &["angularjs", "angular.js", "angular js", "angular2"]),
    ("svelte", &["sveltejs", "svelte.js", "sveltekit"]),
    ("nextjs", &["next.js", "next js", "next"]),
    ("nuxt", &["nuxtjs", "nuxt.js", "nuxt js"]),
    ("css", &["css3", "cascading style sheets"]),
    ("sass", &["scss", "syntactically awesome style sheets"]),
    ("tailwind", &["tailwindcss", "tailwind css"]),
    ("bootstrap", &["bootstrap3", "bootstrap4", "bootstrap5"]),
    // Backend
    ("nodejs", &["node.js", "node js", "node"]),
    ("express", &["express.js", "expressjs", "express js", "express framework"]),
    ("spring", &["spring boot", "springboot", "spring framework"]),
    ("django", &["django rest framework", "drf", "django framework"]),
    ("flask", &["flask framework", "python flask", "flask api"]),
    ("fastapi", &["fast api", "fastapi framework"]),
    ("laravel", &["laravel framework", "php laravel"]),
    // Databases
    ("postgresql", &["postgres", "psql", "pg", "postgre sql", "postgre"]),
    ("mysql", &["my sql", "mariadb"]),
    ("mongodb", &["mongo", "mongo db"]),
    ("redis", &["redis cache", "redis db"]),
    ("elasticsearch", &["elastic search", "elastic"]),
    ("sqlite", &["sqlite3", "sql lite"]),
    ("mssql", &["microsoft sql server", "sql server", "ms sql"]),
    ("dynamodb", &["dynamo db", "dynamo"]),
    // Cloud / DevOps
    ("aws", &["amazon web services", "amazon aws", "aws cloud"]),
    ("gcp", &["google cloud platform", "google cloud"]),
    ("azure", &["microsoft azure", "ms azure", "azure cloud"]),
    ("docker", &["containerization", "docker container", "containers"]),
    ("kubernetes", &["k8s", "kube", "kubernetes orchestration"]),
    ("terraform", &["infrastructure as code", "iac"]),
    ("jenkins", &["jenkins ci", "jenkins pipeline"]),
    ("cicd", &["ci/cd", "ci cd", "continuous integration", "continuous deployment"]),
    ("github actions", &["gh actions"]),
    ("git", &["version control", "git scm", "github", "gitlab"]),
    ("ansible", &["configuration management"]),
    ("linux", &["unix", "ubuntu", "centos"]),
    // AI / ML / data
    ("machine learning", &["ml", "machinelearning"]),
    ("deep learning", &["dl", "neural networks", "deeplearning"]),
    ("artificial intelligence", &["ai"]),
    ("natural language processing", &["nlp"]),
    ("computer vision", &["cv"]),
    ("llm", &["large language model", "large language models", "llms"]),
    ("tensorflow", &["tensor flow"]),
    ("pytorch", &["torch", "py torch"]),
    ("scikit-learn", &["sklearn", "scikit learn"]),
    ("pandas", &["python pandas"]),
    ("numpy", &["numerical python", "numpy array"]),
    ("spark", &["apache spark", "spark streaming"]),
    ("kafka", &["apache kafka", "kafka streaming"]),
    ("hadoop", &["apache hadoop", "hadoop ecosystem"]),
    // Practices / APIs
    ("rest api", &["rest", "restful", "restful api"]),
    ("graphql", &["graph ql"]),
    ("microservices", &["micro services", "microservice architecture"]),
    ("serverless", &["faas"]),
    ("agile", &["agile methodology", "agile development"]),
    ("scrum", &["scrum master", "scrum methodology"]),
    ("tdd", &["test-driven development", "test driven development"]),
    ("oop", &["object-oriented programming", "object oriented"]),
    // Testing / mobile
    ("pytest", &["python testing", "py test"]),
    ("jest", &["jest testing", "jest framework"]),
    ("selenium", &["selenium webdriver", "selenium testing"]),
    ("junit", &["junit testing"]),
    ("cypress", &["cypress testing"]),
    ("react native", &["react-native", "reactnative", "rn"]),
    ("flutter", &["flutter framework", "dart flutter"]),
];

static BUILTIN: Lazy<SkillNormalizer> = Lazy::new(|| SkillNormalizer::with_aliases(BUILTIN_ALIASES));

fn nfkc_lower_trim(input: &str) -> String {
    input.nfkc().collect::<String>().trim().to_lowercase()
}

/// Separator-stripped key so "Node.js", "node js" and "nodejs" collide.
fn compact_key(input: &str) -> String {
    input
        .nfkc()
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '_' | '/' | ','))
        .collect()
}

fn split_segments(input: &str) -> impl Iterator<Item = String> + '_ {
    input
        .split(|c: char| matches!(c, '/' | ',' | ';' | '|' | '+'))
        .map(nfkc_lower_trim)
        .filter(|s| !s.is_empty())
}

/// Outcome of comparing one skill collection against a requirement list.
/// `matched` and `missing` are disjoint, sorted, canonical, and together
/// cover the canonicalized requirement side.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillMatchOutcome {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub match_ratio: f64,
}

impl SkillMatchOutcome {
    pub fn required_len(&self) -> usize {
        self.matched.len() + self.missing.len()
    }
}

/// Canonicalizes skill spellings through an immutable alias table.
///
/// Matching is exact canonical equality only; there is deliberately no fuzzy
/// or substring layer, so ambiguous short tokens cannot produce false
/// positives.
#[derive(Debug, Clone)]
pub struct SkillNormalizer {
    alias_to_canonical: HashMap<String, String>,
    compact_to_canonical: HashMap<String, String>,
}

impl Default for SkillNormalizer {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

impl SkillNormalizer {
    /// Normalizer backed by the builtin alias table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizer with a caller-supplied alias table. Tests use this to pin
    /// down matching behaviour with a tiny controlled table.
    pub fn with_aliases(aliases: &[(&str, &[&str])]) -> Self {
        let mut alias_to_canonical = HashMap::new();
        let mut compact_to_canonical = HashMap::new();

        for (canonical, alias_list) in aliases {
            let canonical_norm = nfkc_lower_trim(canonical);
            alias_to_canonical.insert(canonical_norm.clone(), canonical_norm.clone());
            compact_to_canonical
                .entry(compact_key(canonical))
                .or_insert_with(|| canonical_norm.clone());

            for alias in *alias_list {
                alias_to_canonical.insert(nfkc_lower_trim(alias), canonical_norm.clone());
                compact_to_canonical
                    .entry(compact_key(alias))
                    .or_insert_with(|| canonical_norm.clone());
            }
        }

        Self {
            alias_to_canonical,
            compact_to_canonical,
        }
    }

    fn match_token(&self, token: &str) -> Option<String> {
        if token.is_empty() {
            return None;
        }

        if let Some(canonical) = self.alias_to_canonical.get(token) {
            return Some(canonical.clone());
        }

        self.compact_to_canonical.get(&compact_key(token)).cloned()
    }

    /// Canonical form of a single skill string. Unknown skills fall back to
    /// their NFKC-lowercased spelling, which keeps normalization idempotent.
    pub fn normalize(&self, skill: &str) -> String {
        let normalized = nfkc_lower_trim(skill);
        if let Some(canonical) = self.match_token(&normalized) {
            return canonical;
        }

        for segment in split_segments(skill) {
            if let Some(canonical) = self.match_token(&segment) {
                return canonical;
            }
        }

        normalized
    }

    /// Canonical skill set; blank entries and duplicates collapse.
    pub fn normalize_set(&self, skills: &[String]) -> HashSet<String> {
        skills
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| self.normalize(s))
            .collect()
    }

    /// Match `offered` against `required`, both canonicalized first.
    ///
    /// An empty requirement side yields empty matched/missing sets and a
    /// neutral ratio of 1.0 (the ratio would otherwise be undefined).
    pub fn match_skills(&self, required: &[String], offered: &[String]) -> SkillMatchOutcome {
        let required_set = self.normalize_set(required);
        if required_set.is_empty() {
            return SkillMatchOutcome {
                matched: vec![],
                missing: vec![],
                match_ratio: 1.0,
            };
        }

        let offered_set = self.normalize_set(offered);
        let mut matched: Vec<String> = required_set.intersection(&offered_set).cloned().collect();
        let mut missing: Vec<String> = required_set.difference(&offered_set).cloned().collect();
        matched.sort();
        missing.sort();

        let match_ratio = matched.len() as f64 / required_set.len() as f64;

        SkillMatchOutcome {
            matched,
            missing,
            match_ratio,
        }
    }
}
