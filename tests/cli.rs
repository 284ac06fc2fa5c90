// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate assert_cmd;
extern crate image;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

fn planeshader() -> Command {
    Command::cargo_bin("planeshader").unwrap()
}

#[test]
fn emits_newton_kernel_source() {
    planeshader()
        .args(&["--mode", "newton", "-f", "z^3 - 1", "-d", "3z^2", "--emit-kernel"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vec2 c_pow(vec2 a, vec2 b)"))
        .stdout(predicate::str::contains("vec2 f(vec2 z) { return "))
        .stdout(predicate::str::contains("vec2 df(vec2 z) { return "));
}

#[test]
fn unbound_symbols_are_reported() {
    planeshader()
        .args(&["--mode", "escape", "-f", "w*z + c", "--emit-kernel"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'w'"));
}

#[test]
fn unknown_functions_are_reported() {
    planeshader()
        .args(&["--mode", "newton", "-f", "foo(z)", "-d", "1", "--emit-kernel"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'foo'"));
}

#[test]
fn newton_needs_both_functions() {
    planeshader()
        .args(&["--mode", "newton", "-f", "z^2 - 1", "--emit-kernel"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--derivative"));
}

#[test]
fn renders_a_mandelbrot_png() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mandelbrot.png");
    planeshader()
        .args(&["-m", "mandelbrot", "-s", "40x30", "-c", "-0.5,0", "-t", "1"])
        .arg("-o")
        .arg(&path)
        .assert()
        .success();
    let img = image::open(&path).unwrap().to_rgb();
    assert_eq!(img.dimensions(), (40, 30));
}

#[test]
fn renders_newton_basins_with_every_overlay() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("newton.png");
    planeshader()
        .args(&[
            "-m",
            "newton",
            "-s",
            "32x32",
            "--smooth",
            "--show-roots",
            "--axes",
            "-p",
            "dracula",
            "-t",
            "1",
        ])
        .arg("-o")
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());
}

#[test]
fn rejects_bad_sizes() {
    planeshader()
        .args(&["-s", "forty", "-o", "never.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not parse output image size"));
}

#[test]
fn rejects_unknown_palettes() {
    planeshader()
        .args(&["-p", "mauve", "-o", "never.png"])
        .assert()
        .failure();
}

#[test]
fn uses_every_core_when_no_thread_count_is_given() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("julia.png");
    planeshader()
        .args(&["-m", "julia", "-s", "24x16", "-a", "1"])
        .arg("-o")
        .arg(&path)
        .assert()
        .success();
    let img = image::open(&path).unwrap().to_rgb();
    assert_eq!(img.dimensions(), (24, 16));
}

#[test]
fn huge_literals_are_parse_errors() {
    planeshader()
        .args(&["--mode", "escape", "-f", "z*z + 1e400", "--emit-kernel"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}
