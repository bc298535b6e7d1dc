use crate::{
    error, info,
    messaging::{BackgroundRequest, BackgroundResponse},
    success, warning,
};

use super::{http_client, open_background};

/// Logs in to Spotify through the browser and stores the user token.
pub async fn login() {
    let mut background = open_background(http_client()).await;
    match background.handle(BackgroundRequest::InitiateUserLogin).await {
        BackgroundResponse::LoginSucceeded => success!("Logged in to Spotify"),
        BackgroundResponse::Error { error } => error!("Login failed. Err: {}", error),
        other => warning!("Unexpected login response: {:?}", other),
    }
    background.shutdown();
}

/// Removes every stored token.
pub async fn logout() {
    let mut background = open_background(http_client()).await;
    match background.handle(BackgroundRequest::UserLogout).await {
        BackgroundResponse::LoggedOut => success!("Logged out of Spotify"),
        BackgroundResponse::Error { error } => error!("Logout failed. Err: {}", error),
        other => warning!("Unexpected logout response: {:?}", other),
    }
    background.shutdown();
}

/// Reports whether an app token can be obtained and whether a user is
/// logged in.
pub async fn status() {
    let mut background = open_background(http_client()).await;

    match background.handle(BackgroundRequest::GetAppTokenStatus).await {
        BackgroundResponse::AppTokenStatus { has_token: true } => {
            success!("App token: available")
        }
        BackgroundResponse::AppTokenStatus { has_token: false } => {
            warning!("App token: unavailable (check RYMLINKS_CLIENT_SECRET)")
        }
        other => warning!("Unexpected app token response: {:?}", other),
    }

    match background.handle(BackgroundRequest::GetUserAuthStatus).await {
        BackgroundResponse::UserAuthStatus { is_logged_in: true } => {
            success!("User: logged in")
        }
        BackgroundResponse::UserAuthStatus {
            is_logged_in: false,
        } => info!("User: not logged in. Run `rymlinks login` to enable track links"),
        BackgroundResponse::Error { error } => warning!("Cannot read user session: {}", error),
        other => warning!("Unexpected user status response: {:?}", other),
    }

    background.shutdown();
}
