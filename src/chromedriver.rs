use anyhow::{anyhow, bail, Context, Result};
use log::info;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use zip::ZipArchive;

/// Locate (or download) a chromedriver build matching the installed Chrome.
/// Builds are cached under the local data directory and reused while their
/// major version still matches.
pub async fn ensure_chromedriver() -> Result<PathBuf> {
    let driver_dir = dirs::data_local_dir()
        .context("could not determine local data directory")?
        .join("signedmtg")
        .join("chromedriver");
    fs::create_dir_all(&driver_dir)
        .with_context(|| format!("failed to create {}", driver_dir.display()))?;

    let chrome_version = chrome_version()?;
    let major_version = chrome_version.split('.').next().unwrap_or("");
    info!("detected Chrome version {}", chrome_version);

    let driver_path = driver_dir.join(driver_binary_name(std::env::consts::OS)?);

    if driver_path.exists() {
        match installed_driver_version(&driver_path) {
            Ok(existing) if existing.starts_with(major_version) => {
                info!("compatible chromedriver already present");
                return Ok(driver_path);
            }
            Ok(existing) => {
                info!(
                    "cached chromedriver {} does not match Chrome {}",
                    existing, chrome_version
                );
            }
            Err(e) => info!("could not query cached chromedriver: {}", e),
        }
    }

    info!("downloading chromedriver for Chrome {}...", major_version);
    download_chromedriver(&driver_path, major_version, std::env::consts::OS).await?;
    Ok(driver_path)
}

fn driver_binary_name(os: &str) -> Result<&'static str> {
    match os {
        "linux" | "macos" => Ok("chromedriver"),
        "windows" => Ok("chromedriver.exe"),
        other => bail!("unsupported OS: {}", other),
    }
}

fn installed_driver_version(driver_path: &Path) -> Result<String> {
    let output = Command::new(driver_path)
        .arg("--version")
        .output()
        .context("failed to execute chromedriver")?;
    parse_version_word(&String::from_utf8_lossy(&output.stdout), 1)
}

async fn download_chromedriver(driver_path: &Path, major_version: &str, os: &str) -> Result<()> {
    let client = reqwest::Client::new();

    // Resolve the newest chromedriver release for this Chrome major.
    let version_url = format!(
        "https://googlechromelabs.github.io/chrome-for-testing/LATEST_RELEASE_{}",
        major_version
    );
    let driver_version = client
        .get(&version_url)
        .send()
        .await
        .context("failed to fetch chromedriver release index")?
        .text()
        .await
        .context("failed to read chromedriver release index")?
        .trim()
        .to_string();
    info!("downloading chromedriver {}", driver_version);

    let platform = match os {
        "linux" => "linux64",
        "macos" => "mac-x64",
        "windows" => "win64",
        other => bail!("unsupported OS: {}", other),
    };
    let download_url = format!(
        "https://storage.googleapis.com/chrome-for-testing-public/{}/{}/chromedriver-{}.zip",
        driver_version, platform, platform
    );

    let bytes = client
        .get(&download_url)
        .send()
        .await
        .context("failed to download chromedriver")?
        .bytes()
        .await
        .context("failed to read chromedriver download")?;

    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).context("failed to open chromedriver archive")?;
    let binary_name = driver_binary_name(os)?;
    // The zip nests the binary under chromedriver-<platform>/.
    let entry_name = archive
        .file_names()
        .find(|name| name.ends_with(binary_name))
        .map(|name| name.to_string())
        .context("chromedriver binary not found in archive")?;
    let mut entry = archive
        .by_name(&entry_name)
        .context("failed to read chromedriver from archive")?;

    let mut contents = Vec::new();
    entry
        .read_to_end(&mut contents)
        .context("failed to extract chromedriver")?;
    drop(entry);
    fs::write(driver_path, contents)
        .with_context(|| format!("failed to write {}", driver_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(driver_path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(driver_path, perms)?;
    }

    info!("chromedriver saved to {}", driver_path.display());
    Ok(())
}

pub fn find_chrome_executable() -> Result<PathBuf> {
    let candidates: &[&str] = match std::env::consts::OS {
        "windows" => &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ],
        "macos" => &["/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"],
        "linux" => &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ],
        other => bail!("unsupported OS: {}", other),
    };

    for candidate in candidates {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Ok(path);
        }
    }

    // Fall back to the shell's lookup.
    if let Ok(output) = Command::new("which").arg("google-chrome").output() {
        let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !found.is_empty() {
            return Ok(PathBuf::from(found));
        }
    }

    Err(anyhow!("Chrome executable not found"))
}

pub fn chrome_version() -> Result<String> {
    let chrome_path = find_chrome_executable()?;
    info!("found Chrome at {}", chrome_path.display());

    let output = Command::new(&chrome_path)
        .arg("--version")
        .output()
        .context("failed to execute Chrome")?;
    // Output looks like "Google Chrome 120.0.6099.109"; the version is last.
    let text = String::from_utf8_lossy(&output.stdout);
    text.split_whitespace()
        .last()
        .map(|s| s.to_string())
        .context("could not parse Chrome version")
}

fn parse_version_word(output: &str, index: usize) -> Result<String> {
    output
        .split_whitespace()
        .nth(index)
        .map(|s| s.to_string())
        .context("could not parse version output")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_version_is_second_word() {
        let output = "ChromeDriver 120.0.6099.109 (abcdef-refs/branch-heads/6099)";
        assert_eq!(parse_version_word(output, 1).unwrap(), "120.0.6099.109");
    }

    #[test]
    fn empty_version_output_is_an_error() {
        assert!(parse_version_word("", 1).is_err());
    }

    #[test]
    fn binary_name_per_platform() {
        assert_eq!(driver_binary_name("linux").unwrap(), "chromedriver");
        assert_eq!(driver_binary_name("windows").unwrap(), "chromedriver.exe");
        assert!(driver_binary_name("plan9").is_err());
    }
}
