mod common;

use common::{passphrase, pipeline, rb_bytes, write_submission, MockChecker, MockCipher, POV_XML};
use cqe_core::archive::build_archive_bytes;
use cqe_core::cipher::{BundleCipher, Passphrase};
use cqe_core::error::CoreError;
use cqe_core::hashing::{sha256, sha256_file};
use cqe_core::identifiers::{canonicalize_pov, combine_digests};
use cqe_core::naming::{parse_csid, BundleName};
use cqe_core::pipeline::{PackageRequest, SolutionPipeline, Stage, VerifyRequest};
use std::fs;
use std::path::{Path, PathBuf};

fn package_into(dir: &Path, csid: &str, count: u8) -> (PathBuf, PathBuf, Vec<PathBuf>) {
    let inputs = dir.join("inputs");
    let out = dir.join("packaged");
    fs::create_dir_all(&inputs).unwrap();
    fs::create_dir_all(&out).unwrap();
    let (pov, rbs) = write_submission(&inputs, csid, count);
    let req = PackageRequest {
        csid: csid.to_string(),
        pov: pov.clone(),
        rbs: rbs.clone(),
        output_dir: out,
    };
    let outcome = pipeline().package(&req, &passphrase()).unwrap();
    (outcome.package, pov, rbs)
}

fn verify_request(dir: &Path, bundle: &Path) -> VerifyRequest {
    let out = dir.join("verified");
    fs::create_dir_all(&out).unwrap();
    VerifyRequest {
        bundle: bundle.to_path_buf(),
        output_dir: out,
    }
}

#[test]
fn package_then_verify_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let (package, pov, rbs) = package_into(dir.path(), "00000003", 3);

    let name = package.file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("00000003_"));
    assert!(name.ends_with(".ar.enc"));
    let commitment = package.with_file_name(name.replace(".ar.enc", ".txt"));
    assert!(commitment.is_file());
    assert_eq!(fs::metadata(&commitment).unwrap().len(), 0);

    let req = verify_request(dir.path(), &package);
    let report = pipeline().verify(&req, &passphrase()).unwrap();

    assert_eq!(report.csid, "00000003");
    assert_eq!(fs::read(&report.pov).unwrap(), fs::read(&pov).unwrap());
    assert_eq!(report.rbs.len(), 3);
    for (got, want) in report.rbs.iter().zip(&rbs) {
        assert_eq!(got.file_name(), want.file_name());
        assert_eq!(fs::read(got).unwrap(), fs::read(want).unwrap());
    }

    let pov_expected = sha256(&canonicalize_pov(POV_XML));
    assert_eq!(report.pov_list_id.hex, hex::encode(pov_expected));
    let cb_expected =
        combine_digests(&[sha256(&rb_bytes(1)), sha256(&rb_bytes(2)), sha256(&rb_bytes(3))])
            .unwrap();
    assert_eq!(report.cb_list_id.hex, hex::encode(cb_expected));
    assert_eq!(
        report.cb_list_id.to_string(),
        format!("00000003, {}", report.cb_list_id.hex)
    );
}

#[test]
fn name_hash_is_plaintext_archive_hash() {
    let dir = tempfile::tempdir().unwrap();
    let (package, _, _) = package_into(dir.path(), "00000001", 1);

    let plaintext = MockCipher.decrypt(&package, &passphrase()).unwrap();
    let name = package.file_name().unwrap().to_str().unwrap();
    assert!(name.contains(&hex::encode(sha256(&plaintext))));
}

#[test]
fn packaging_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let (first, _, _) = package_into(&dir.path().join("a"), "00000002", 2);
    let (second, _, _) = package_into(&dir.path().join("b"), "00000002", 2);
    assert_eq!(first.file_name(), second.file_name());
}

#[test]
fn tampered_archive_fails_hash_check() {
    let dir = tempfile::tempdir().unwrap();
    let (package, _, _) = package_into(dir.path(), "00000003", 3);

    let mut plaintext = MockCipher.decrypt(&package, &passphrase()).unwrap();
    let needle = rb_bytes(2);
    let at = plaintext
        .windows(needle.len())
        .position(|w| w == needle.as_slice())
        .unwrap();
    plaintext[at + 20] ^= 0x01;
    fs::write(&package, MockCipher.encrypt(&plaintext, &passphrase()).unwrap()).unwrap();

    let req = verify_request(dir.path(), &package);
    let err = pipeline().verify(&req, &passphrase()).unwrap_err();
    assert_eq!(err.stage, Stage::VerifyHash);
    assert!(matches!(err.error, CoreError::HashMismatch { .. }));
    // nothing reaches the output directory
    assert_eq!(fs::read_dir(&req.output_dir).unwrap().count(), 0);
}

#[test]
fn wrong_passphrase_fails_at_decrypt() {
    let dir = tempfile::tempdir().unwrap();
    let (package, _, _) = package_into(dir.path(), "00000001", 1);

    let req = verify_request(dir.path(), &package);
    let err = pipeline().verify(&req, &Passphrase::new("wrong")).unwrap_err();
    assert_eq!(err.stage, Stage::Decrypt);
    match err.error {
        CoreError::ExternalTool { status, stderr, .. } => {
            assert_eq!(status, Some(1));
            assert!(stderr.contains("bad decrypt"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn malformed_bundle_name_fails_before_decrypt() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("00000001_deadbeef.ar.enc");
    fs::write(&bogus, b"whatever").unwrap();

    let req = verify_request(dir.path(), &bogus);
    let err = pipeline().verify(&req, &passphrase()).unwrap_err();
    assert_eq!(err.stage, Stage::ParseName);
    assert!(matches!(err.error, CoreError::Naming(_)));
}

#[test]
fn missing_output_dir_fails_at_copy() {
    let dir = tempfile::tempdir().unwrap();
    let (package, _, _) = package_into(dir.path(), "00000001", 1);

    let req = VerifyRequest {
        bundle: package,
        output_dir: dir.path().join("does-not-exist"),
    };
    let err = pipeline().verify(&req, &passphrase()).unwrap_err();
    assert_eq!(err.stage, Stage::Copy);
    assert!(matches!(err.error, CoreError::Resource { .. }));
}

#[test]
fn rejected_binary_stops_packaging() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    let (pov, rbs) = write_submission(dir.path(), "00000002", 2);

    let p = SolutionPipeline::new(MockCipher)
        .with_binary_checker(MockChecker::rejecting("cgcef_verify", "RB_00000002_02"));
    let req = PackageRequest {
        csid: "00000002".to_string(),
        pov,
        rbs,
        output_dir: out.clone(),
    };
    let err = p.package(&req, &passphrase()).unwrap_err();
    assert_eq!(err.stage, Stage::CheckBinaries);
    assert!(matches!(err.error, CoreError::ExternalTool { status: Some(3), .. }));
    assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn rejected_pov_stops_packaging() {
    let dir = tempfile::tempdir().unwrap();
    let (pov, rbs) = write_submission(dir.path(), "00000001", 1);

    let p = SolutionPipeline::new(MockCipher)
        .with_pov_checker(MockChecker::rejecting("poll-validate", "POV_00000001.xml"));
    let req = PackageRequest {
        csid: "00000001".to_string(),
        pov,
        rbs,
        output_dir: dir.path().to_path_buf(),
    };
    let err = p.package(&req, &passphrase()).unwrap_err();
    assert_eq!(err.stage, Stage::CheckPov);
}

#[test]
fn wrong_rb_count_is_rejected_when_packaging() {
    let dir = tempfile::tempdir().unwrap();
    let (pov, mut rbs) = write_submission(dir.path(), "00000003", 3);
    rbs.pop();

    let req = PackageRequest {
        csid: "00000003".to_string(),
        pov,
        rbs,
        output_dir: dir.path().to_path_buf(),
    };
    let err = pipeline().package(&req, &passphrase()).unwrap_err();
    assert_eq!(err.stage, Stage::ValidateInputs);
    assert!(matches!(err.error, CoreError::Naming(_)));
}

#[test]
fn missing_input_file_is_a_resource_error() {
    let dir = tempfile::tempdir().unwrap();
    let req = PackageRequest {
        csid: "00000001".to_string(),
        pov: dir.path().join("POV_00000001.xml"),
        rbs: vec![dir.path().join("RB_00000001_01")],
        output_dir: dir.path().to_path_buf(),
    };
    let err = pipeline().package(&req, &passphrase()).unwrap_err();
    assert_eq!(err.stage, Stage::ValidateInputs);
    assert!(matches!(err.error, CoreError::Resource { .. }));
}

/// Encrypts a hand-built archive and names it after its real hash, so the
/// run gets past the hash check and reaches member validation.
fn seal_archive(dir: &Path, csid: &str, members: &[(String, PathBuf)]) -> PathBuf {
    let archive = build_archive_bytes(members).unwrap();
    let name = BundleName::new(parse_csid(csid).unwrap(), sha256(&archive));
    let path = dir.join(name.package_file_name());
    fs::write(&path, MockCipher.encrypt(&archive, &passphrase()).unwrap()).unwrap();
    path
}

#[test]
fn extra_member_fails_naming_validation() {
    let dir = tempfile::tempdir().unwrap();
    let (pov, rbs) = write_submission(dir.path(), "00000001", 1);
    let extra = dir.path().join("notes.txt");
    fs::write(&extra, b"stowaway").unwrap();

    let bundle = seal_archive(
        dir.path(),
        "00000001",
        &[
            ("POV_00000001.xml".to_string(), pov),
            ("RB_00000001_01".to_string(), rbs[0].clone()),
            ("notes.txt".to_string(), extra),
        ],
    );
    let req = verify_request(dir.path(), &bundle);
    let err = pipeline().verify(&req, &passphrase()).unwrap_err();
    assert_eq!(err.stage, Stage::ValidateNaming);
    assert!(matches!(err.error, CoreError::Naming(_)));
}

#[test]
fn archive_without_pov_fails_naming_validation() {
    let dir = tempfile::tempdir().unwrap();
    let (_, rbs) = write_submission(dir.path(), "00000002", 2);

    let bundle = seal_archive(
        dir.path(),
        "00000002",
        &[
            ("RB_00000002_01".to_string(), rbs[0].clone()),
            ("RB_00000002_02".to_string(), rbs[1].clone()),
        ],
    );
    let req = verify_request(dir.path(), &bundle);
    let err = pipeline().verify(&req, &passphrase()).unwrap_err();
    assert_eq!(err.stage, Stage::ValidateNaming);
}

#[test]
fn archive_order_does_not_matter() {
    let dir = tempfile::tempdir().unwrap();
    let (pov, rbs) = write_submission(dir.path(), "00000002", 2);

    let bundle = seal_archive(
        dir.path(),
        "00000002",
        &[
            ("RB_00000002_02".to_string(), rbs[1].clone()),
            ("POV_00000002.xml".to_string(), pov),
            ("RB_00000002_01".to_string(), rbs[0].clone()),
        ],
    );
    let req = verify_request(dir.path(), &bundle);
    let report = pipeline().verify(&req, &passphrase()).unwrap();
    assert_eq!(
        report.rbs[0].file_name().unwrap().to_str().unwrap(),
        "RB_00000002_01"
    );
    assert_eq!(sha256_file(&report.rbs[1]).unwrap(), sha256(&rb_bytes(2)));
}

#[test]
fn failed_copy_leaves_output_dir_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (package, _, _) = package_into(dir.path(), "00000002", 2);

    let req = verify_request(dir.path(), &package);
    fs::create_dir(req.output_dir.join("RB_00000002_02")).unwrap();

    let err = pipeline().verify(&req, &passphrase()).unwrap_err();
    assert_eq!(err.stage, Stage::Copy);
    assert!(matches!(err.error, CoreError::Resource { .. }));

    let left: Vec<String> = fs::read_dir(&req.output_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(left, vec!["RB_00000002_02"]);
}
