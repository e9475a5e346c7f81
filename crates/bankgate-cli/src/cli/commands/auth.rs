//! Sign-in, registration and sign-out.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use bankgate_core::Redirect;
use bankgate_core::backend::Registration;
use bankgate_core::portal::Portal;

pub async fn login(
    portal: &Portal,
    user: &str,
    password: Option<String>,
    next: Option<&str>,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };
    let landing = portal.login(user, &password, next).await?;
    print_landing(portal, &landing);
    Ok(())
}

/// Collects the registration fields, prompting for the password if needed.
pub fn registration(
    username: String,
    email: String,
    mobile: String,
    password: Option<String>,
) -> Result<Registration> {
    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };
    Ok(Registration {
        username,
        email,
        mobile,
        password,
    })
}

pub async fn register(portal: &Portal, registration: &Registration) -> Result<()> {
    let landing = portal.register(registration).await?;
    println!("Account created for {}.", registration.username);
    print_landing(portal, &landing);
    Ok(())
}

pub fn logout(portal: &Portal) {
    if portal.logout() {
        println!("Signed out.");
    } else {
        println!("Not signed in.");
    }
}

fn print_landing(portal: &Portal, landing: &Redirect) {
    if let Some(profile) = portal.profiles().profile() {
        match &profile.role {
            Some(role) => println!("Signed in as {} ({}).", role.display_name(), profile.status),
            None => println!("Signed in ({}).", profile.status),
        }
    }
    if let Some(reason) = landing.reason {
        println!("{}", reason.message());
    }
    println!("Landing: {landing}");
}

fn prompt_password() -> Result<String> {
    print!("Password: ");
    io::stdout().flush().context("flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}
