//! Onboarding status and profile submission.

use anyhow::{Context, Result, bail};
use bankgate_core::portal::{Portal, SubmitError};
use bankgate_core::profile::{ProfileSubmission, rejection_notice};
use bankgate_types::ProfileField;

pub async fn show(portal: &Portal) -> Result<()> {
    let Some(profile) = portal.current_profile().await else {
        if let Some(err) = portal.profiles().snapshot().last_error {
            bail!("{err}");
        }
        println!("Not signed in.");
        return Ok(());
    };

    let role = profile
        .role
        .as_ref()
        .map_or_else(|| "unknown".to_string(), |r| r.display_name());
    println!("Role:   {role}");
    println!("Status: {}", profile.status);

    if let Some(notice) = rejection_notice(&profile) {
        println!("{notice}");
    }

    let policy = profile.editor_policy();
    if !policy.accepts_submission() {
        println!("Your details are under review; the profile is read-only.");
        return Ok(());
    }
    if policy.starts_editable() {
        println!("Complete the following to continue:");
    } else if policy.can_toggle_edit() {
        println!("Updates need the following:");
    }
    for field in policy.required_fields() {
        println!("  {:<24}{}", field.label(), field.key());
    }
    Ok(())
}

pub async fn submit(portal: &Portal, submission: &ProfileSubmission) -> Result<()> {
    match portal.submit_profile(submission).await {
        Ok(transition) => {
            println!("Submitted. Status: {}", transition.to);
            Ok(())
        }
        Err(SubmitError::Invalid(errors)) => {
            for error in &errors {
                eprintln!("{}: {}", error.field.label(), error.message);
            }
            bail!("Profile has {} invalid field(s)", errors.len())
        }
        Err(SubmitError::NoProfile) => bail!("Not signed in"),
        Err(SubmitError::Backend(err)) => Err(err),
    }
}

/// Parses `field=value` pairs keyed by wire name.
pub fn parse_fields(pairs: &[String]) -> Result<ProfileSubmission> {
    let mut submission = ProfileSubmission::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Expected FIELD=VALUE, got '{pair}'"))?;
        let Some(field) = ProfileField::from_key(key) else {
            let known: Vec<&str> = ProfileField::all().iter().map(|f| f.key()).collect();
            bail!("Unknown field '{}' (expected one of: {})", key.trim(), known.join(", "));
        };
        submission.set(field, value);
    }
    Ok(submission)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fields() {
        let submission =
            parse_fields(&["firstName=Asha".to_string(), "city= Pune ".to_string()]).unwrap();
        assert_eq!(submission.get(ProfileField::FirstName), Some("Asha"));
        assert_eq!(submission.get(ProfileField::City), Some("Pune"));
    }

    #[test]
    fn test_parse_fields_rejects_unknown_or_malformed() {
        assert!(parse_fields(&["nickname=x".to_string()]).is_err());
        assert!(parse_fields(&["firstName".to_string()]).is_err());
    }
}
