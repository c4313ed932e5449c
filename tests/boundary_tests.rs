use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

#[test]
fn test_exact_balance_transfer_drains_account() {
    let file = common::command_file(&[
        "register,fay@example.com,Fay,,,,3,",
        "transfer,admin@example.com,fay@example.com,10000",
    ]);

    let mut cmd = Command::new(cargo_bin!("minibank"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("admin@example.com,Administrador,1,true,0,2"))
        .stdout(predicate::str::contains("fay@example.com,Fay,3,false,10000,1"));
}

#[test]
fn test_extreme_decimal_precision() {
    let file = common::command_file(&[
        "register,fay@example.com,Fay,,,,3,",
        "transfer,admin@example.com,fay@example.com,0.0001",
        "transfer,admin@example.com,fay@example.com,0.0001",
    ]);

    let mut cmd = Command::new(cargo_bin!("minibank"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("fay@example.com,Fay,3,false,0.0002,2"))
        .stdout(predicate::str::contains("admin@example.com,Administrador,1,true,9999.9998,3"));
}
