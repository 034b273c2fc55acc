use anyhow::{Context, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use wtx_e::WebDriverFactory;
use wtx_engine::config::{ConfigLoader, ExplorationSettings};
use wtx_engine::queue::{Frontier, Partition};
use wtx_engine::registry::FactoryRegistry;
use wtx_engine::testcase::{Replayer, TestCase};
use wtx_engine::Explorer;

pub struct DriverOptions {
    pub webdriver_url: String,
    pub headless: bool,
}

impl DriverOptions {
    fn factory(&self) -> Arc<WebDriverFactory> {
        let mut factory = WebDriverFactory::new(&self.webdriver_url);
        if self.headless {
            factory = factory.with_capabilities(WebDriverFactory::headless());
        }
        Arc::new(factory)
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct ExploreOverrides {
    pub url: Option<String>,
    pub max_length: Option<usize>,
    pub partition: Option<usize>,
    pub partitions: Option<usize>,
    pub queue_file: Option<PathBuf>,
    pub resume: bool,
    pub output_dir: Option<PathBuf>,
}

impl ExploreOverrides {
    pub fn apply(self, settings: &mut ExplorationSettings) {
        if let Some(url) = self.url {
            settings.url = url;
        }
        if let Some(max_length) = self.max_length {
            settings.max_length = max_length;
        }
        if let Some(count) = self.partitions {
            settings.partition = Some(Partition {
                number: self.partition.unwrap_or(0),
                count,
            });
        }
        if self.queue_file.is_some() {
            settings.queue_file = self.queue_file;
        }
        if self.resume {
            settings.resume = true;
        }
        if let Some(dir) = self.output_dir {
            settings.output_dir = dir;
        }
    }
}

async fn load_settings(config: Option<&Path>) -> anyhow::Result<ExplorationSettings> {
    match config {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("Failed to load {}", path.display())),
        None => Ok(ConfigLoader::load_default().await?),
    }
}

pub async fn explore(
    config: Option<&Path>,
    overrides: ExploreOverrides,
    driver: &DriverOptions,
) -> anyhow::Result<()> {
    let mut settings = load_settings(config).await?;
    overrides.apply(&mut settings);

    let mut registry = FactoryRegistry::new();
    settings.register_profiles(&mut registry);
    let explorer_config = settings.build(&registry)?;

    info!(
        "Exploring {} up to length {}",
        settings.url, settings.max_length
    );
    let mut explorer = Explorer::new(explorer_config, driver.factory(), settings.sink());
    let stats = explorer.run().await?;

    println!(
        "{} sequences run, {} with failures, {} abandoned, {} test cases written to {}",
        stats.run,
        stats.failed,
        stats.errored,
        stats.emitted,
        settings.output_dir.display()
    );
    Ok(())
}

pub async fn replay(
    config: Option<&Path>,
    pattern: &str,
    driver: &DriverOptions,
) -> anyhow::Result<()> {
    let settings = load_settings(config).await?;
    let mut registry = FactoryRegistry::new();
    settings.register_profiles(&mut registry);

    let replayer = Replayer::new(driver.factory(), &registry)
        .with_retries(settings.num_retries)
        .with_wait_settings(settings.wait_settings());

    let paths = glob::glob(pattern).with_context(|| format!("Invalid pattern '{}'", pattern))?;
    let (mut total, mut failed) = (0, 0);
    for entry in paths {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                continue;
            }
        };
        let case = TestCase::load(&path)
            .await
            .with_context(|| format!("Failed to load {}", path.display()))?;
        total += 1;
        match replayer.replay(&case).await {
            Ok(result) if result.passed() => println!("PASSED {}", case.name),
            Ok(result) => {
                failed += 1;
                println!("FAILED {}", case.name);
                for failure in &result.failures {
                    println!("  - {}", failure);
                }
            }
            Err(e) => {
                failed += 1;
                error!("Could not replay {}: {}", case.name, e);
                println!("ERROR  {}", case.name);
            }
        }
    }

    if total == 0 {
        bail!("No test cases match '{}'", pattern);
    }
    println!("{} of {} test cases passed", total - failed, total);
    if failed > 0 {
        bail!("{} test cases failed", failed);
    }
    Ok(())
}

pub async fn frontier(file: &Path) -> anyhow::Result<()> {
    let frontier = Frontier::load(file)
        .await
        .with_context(|| format!("Failed to load {}", file.display()))?;
    println!("{} queued sequences, next first:", frontier.len());
    for (i, sequence) in frontier.iter().enumerate() {
        println!("{:>5}. {}", i + 1, sequence);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let mut settings = ExplorationSettings {
            url: "http://config/".into(),
            ..ExplorationSettings::default()
        };
        ExploreOverrides {
            url: Some("http://cli/".into()),
            max_length: Some(5),
            partition: Some(2),
            partitions: Some(4),
            resume: true,
            ..ExploreOverrides::default()
        }
        .apply(&mut settings);

        assert_eq!(settings.url, "http://cli/");
        assert_eq!(settings.max_length, 5);
        assert_eq!(settings.partition, Some(Partition { number: 2, count: 4 }));
        assert!(settings.resume);
        assert_eq!(settings.output_dir, PathBuf::from("testcases"));
    }

    #[test]
    fn absent_overrides_keep_config_values() {
        let mut settings = ExplorationSettings {
            max_length: 4,
            queue_file: Some("queue.json".into()),
            ..ExplorationSettings::default()
        };
        ExploreOverrides::default().apply(&mut settings);
        assert_eq!(settings.max_length, 4);
        assert_eq!(settings.queue_file, Some(PathBuf::from("queue.json")));
        assert_eq!(settings.partition, None);
    }
}
