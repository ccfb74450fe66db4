use crate::cipher::{BundleCipher, Passphrase};
use crate::error::{CoreError, CoreResult};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

const PASSPHRASE_ENV: &str = "CQE_BUNDLE_PASSPHRASE";

/// Runs the `openssl` command-line tool in passphrase mode, e.g.
/// `openssl aes-256-cbc -salt -pass env:...`. The passphrase is handed over
/// through the child's environment so it never shows up in a process listing
/// or in error messages.
#[derive(Debug, Clone)]
pub struct OpensslCipher {
    program: PathBuf,
    cipher: String,
    message_digest: Option<String>,
}

impl Default for OpensslCipher {
    fn default() -> Self {
        Self {
            program: PathBuf::from("openssl"),
            cipher: "aes-256-cbc".to_string(),
            message_digest: None,
        }
    }
}

impl OpensslCipher {
    pub fn new(program: impl Into<PathBuf>, cipher: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            cipher: cipher.into(),
            message_digest: None,
        }
    }

    /// Key-derivation digest (`-md`). Left unset, openssl picks its own
    /// default, which changed between releases.
    pub fn with_message_digest(mut self, digest: impl Into<String>) -> Self {
        self.message_digest = Some(digest.into());
        self
    }

    fn base_args(&self, decrypt: bool) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![self.cipher.clone().into()];
        if decrypt {
            args.push("-d".into());
        } else {
            args.push("-salt".into());
        }
        if let Some(md) = &self.message_digest {
            args.push("-md".into());
            args.push(md.into());
        }
        args.push("-pass".into());
        args.push(format!("env:{}", PASSPHRASE_ENV).into());
        args
    }

    fn command_line(&self, args: &[OsString]) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }

    fn run(
        &self,
        args: Vec<OsString>,
        passphrase: &Passphrase,
        stdin: Option<&[u8]>,
    ) -> CoreResult<Vec<u8>> {
        let command = self.command_line(&args);
        tracing::debug!(command = %command, "invoking cipher");

        let mut child = Command::new(&self.program)
            .args(&args)
            .env(PASSPHRASE_ENV, passphrase.expose())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CoreError::ExternalTool {
                command: command.clone(),
                status: None,
                stderr: e.to_string(),
            })?;

        // Feed stdin from a helper thread; writing everything before reading
        // stdout deadlocks once the pipe buffers fill.
        let feeder = match (stdin, child.stdin.take()) {
            (Some(data), Some(mut pipe)) => {
                let data = data.to_vec();
                Some(std::thread::spawn(move || pipe.write_all(&data)))
            }
            _ => None,
        };

        let output = child.wait_with_output()?;
        let fed = match feeder {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "stdin feeder panicked",
                ))
            }),
            None => Ok(()),
        };

        check_output(&command, &output)?;
        fed?;
        Ok(output.stdout)
    }
}

fn check_output(command: &str, output: &Output) -> CoreResult<()> {
    if output.status.success() {
        return Ok(());
    }
    Err(CoreError::ExternalTool {
        command: command.to_string(),
        status: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

impl BundleCipher for OpensslCipher {
    fn encrypt(&self, plaintext: &[u8], passphrase: &Passphrase) -> CoreResult<Vec<u8>> {
        let args = self.base_args(false);
        self.run(args, passphrase, Some(plaintext))
    }

    fn decrypt(&self, ciphertext: &Path, passphrase: &Passphrase) -> CoreResult<Vec<u8>> {
        if !ciphertext.is_file() {
            return Err(CoreError::resource(ciphertext, "encrypted input not found"));
        }
        let mut args = self.base_args(true);
        args.push("-in".into());
        args.push(ciphertext.as_os_str().to_os_string());
        self.run(args, passphrase, None)
    }
}
