//! Subcommand implementations.
//!
//! User-initiated actions surface their errors; background GPS and
//! notification refreshes only log theirs.

use std::future::Future;
use std::pin::Pin;

use anyhow::{anyhow, bail, Result};
use chrono::Local;
use tracing::{info, warn};

use carrent_core::auth::{Access, AuthError, LoginFlow, Route};
use carrent_core::models::{
    filter_cars, partition_by_activity, tracked_ids, Car, CarForm, NewRental, Rental,
};
use carrent_core::poll::{AccountPoller, GpsTracker, NotificationFeed, PollHandle};
use carrent_core::utils::{format_eth, format_timestamp, shorten_address};

use crate::prompt::PromptSigner;
use crate::AppContext;

impl AppContext {
    /// Connected wallet account, required by account-scoped commands
    fn require_account(&self) -> Result<&str> {
        self.account
            .as_deref()
            .ok_or_else(|| anyhow!("Wallet not connected - pass --account or set CARRENT_ACCOUNT"))
    }

    fn enter(&self, route: Route) -> Result<()> {
        match self.guard.check(&route) {
            Access::Granted => Ok(()),
            Access::Denied => bail!("{} requires login - run `carrent login` first", route.path()),
        }
    }
}

pub async fn login(mut ctx: AppContext, flow: &LoginFlow) -> Result<()> {
    let wallet = ctx.account.clone().map(PromptSigner::new);
    let token = flow
        .login(wallet.as_ref().map(|w| w as &dyn carrent_core::WalletSigner))
        .await;

    match token {
        Ok(_) => {
            let account = ctx.require_account()?.to_string();
            println!("Logged in as {}", shorten_address(&account));
            ctx.config.last_account = Some(account);
            if let Err(e) = ctx.config.save() {
                warn!(error = %e, "Failed to save config");
            }
            Ok(())
        }
        Err(AuthError::WalletNotConnected) => {
            bail!("Wallet not connected - pass --account or set CARRENT_ACCOUNT")
        }
        Err(e) => Err(e.into()),
    }
}

pub fn status(ctx: &AppContext) -> Result<()> {
    match &ctx.account {
        Some(account) => println!("Wallet:  {}", shorten_address(account)),
        None => println!("Wallet:  not connected"),
    }
    let session = ctx.session.snapshot();
    println!(
        "Session: {}",
        if session.is_authenticated { "logged in" } else { "logged out" }
    );
    println!("API:     {}", ctx.api.base_url());
    Ok(())
}

fn print_car(car: &Car) {
    let status = if car.is_available { "available" } else { "rented" };
    println!(
        "{:<20} {:<32} {:>14}/day  {}",
        car.vin_number,
        car.display_name(),
        format_eth(car.rental_price),
        status
    );
}

pub async fn cars(ctx: &AppContext, search: Option<&str>) -> Result<()> {
    let cars = ctx.api.available_cars().await?;
    let shown = filter_cars(&cars, search.unwrap_or_default());
    if shown.is_empty() {
        match search {
            Some(term) => println!("No cars match \"{}\"", term),
            None => println!("No cars available"),
        }
    }
    for car in shown {
        print_car(car);
    }
    Ok(())
}

pub async fn car(ctx: &AppContext, vin: &str) -> Result<()> {
    let car = ctx.api.car(vin).await?;
    println!("{}", car.display_name());
    println!("VIN:    {}", car.vin_number);
    if let Some(owner) = &car.owner_address {
        println!("Owner:  {}", shorten_address(owner));
    }
    println!("Price:  {}/day", format_eth(car.rental_price));
    if car.is_available {
        println!("Status: available");
    } else {
        match ctx.api.active_rental_for_car(vin).await {
            Ok(Some(rental)) => println!(
                "Status: rented until {}",
                format_timestamp(&rental.end_time)
            ),
            Ok(None) => println!("Status: unavailable"),
            Err(e) => warn!(vin = %vin, error = %e, "Failed to look up active rental"),
        }
    }
    if let Some(url) = &car.image_url {
        println!("Image:  {}", url);
    }
    Ok(())
}

pub async fn owned(ctx: &AppContext, owner: Option<String>) -> Result<()> {
    let owner = match owner {
        Some(owner) => owner,
        None => ctx.require_account()?.to_string(),
    };
    let cars = ctx.api.cars_by_owner(&owner).await?;
    println!("{} car(s) owned by {}", cars.len(), shorten_address(&owner));
    for car in &cars {
        print_car(car);
    }
    Ok(())
}

pub async fn register(ctx: &AppContext, form: CarForm) -> Result<()> {
    ctx.enter(Route::RegisterCar)?;
    let owner = ctx.require_account()?;
    let registration = form.validate(owner)?;
    let car = ctx.api.register_car(&registration).await?;
    println!("Registered {}", car.display_name());
    Ok(())
}

pub async fn rent(ctx: &AppContext, vin: &str, days: u32) -> Result<()> {
    let renter = ctx.require_account()?;
    let car = ctx.api.car(vin).await?;
    if !car.is_available {
        bail!("{} is not available", car.display_name());
    }
    let request = NewRental::for_days(&car, renter, days, Local::now().naive_local())
        .ok_or_else(|| anyhow!("Rental must last at least one day"))?;
    let rental = ctx.api.create_rental(&request).await?;
    info!(rental = %rental.id, "Rental created");
    println!(
        "Rented {} until {} for {}",
        car.display_name(),
        format_timestamp(&rental.end_time),
        format_eth(rental.total_amount)
    );
    Ok(())
}

fn print_rental(rental: &Rental, gps: &GpsTracker) {
    println!("{}  [{}]", rental.title(), rental.id);
    println!(
        "    {} -> {}   {}",
        format_timestamp(&rental.start_time),
        format_timestamp(&rental.end_time),
        format_eth(rental.total_amount)
    );
    if let Some(fix) = rental.active_tracking_id().and_then(|id| gps.latest(id)) {
        println!(
            "    Last seen {} at {}",
            format_timestamp(&fix.timestamp),
            fix.maps_url()
        );
    }
}

pub async fn rentals(ctx: &AppContext) -> Result<()> {
    ctx.enter(Route::MyRentals)?;
    let renter = ctx.require_account()?;
    let rentals = ctx.api.rentals_for_renter(renter).await?;

    let gps = GpsTracker::new(ctx.api.clone());
    gps.refresh(&tracked_ids(&rentals)).await;

    let (active, past) = partition_by_activity(rentals);
    println!("Active rentals ({})", active.len());
    if active.is_empty() {
        println!("    No active rentals found.");
    }
    for rental in &active {
        print_rental(rental, &gps);
    }
    println!("\nPast rentals ({})", past.len());
    if past.is_empty() {
        println!("    No past rentals found.");
    }
    for rental in &past {
        print_rental(rental, &gps);
    }
    Ok(())
}

pub async fn complete(ctx: &AppContext, rental_id: &str) -> Result<()> {
    ctx.enter(Route::MyRentals)?;
    let rental = ctx.api.complete_rental(rental_id).await?;
    println!("Completed {}", rental.title());
    Ok(())
}

pub async fn notifications(
    ctx: &AppContext,
    read: Option<String>,
    read_all: bool,
) -> Result<()> {
    let account = ctx.require_account()?;
    let feed = NotificationFeed::new(ctx.api.clone());

    if let Some(id) = read {
        feed.mark_read(account, &id).await?;
    } else if read_all {
        feed.mark_all_read(account).await?;
    } else if !feed.refresh(account).await {
        bail!("Could not fetch notifications");
    }

    let state = feed.state();
    println!("{} unread", state.unread);
    for n in &state.notifications {
        let marker = if n.read { " " } else { "*" };
        println!(
            "{} [{:<8}] {}  {} - {}",
            marker,
            n.kind.label(),
            format_timestamp(&n.timestamp),
            n.title,
            n.message
        );
    }
    Ok(())
}

/// Run `work` unless `shutdown` fires first. `shutdown` is borrowed so the
/// same signal can guard every await of a loop.
async fn or_shutdown<S, F>(shutdown: Pin<&mut S>, work: F) -> Option<F::Output>
where
    S: Future,
    F: Future,
{
    tokio::select! {
        _ = shutdown => None,
        output = work => Some(output),
    }
}

pub async fn watch(ctx: &AppContext) -> Result<()> {
    ctx.enter(Route::MyRentals)?;
    let account = ctx.require_account()?.to_string();
    let period = ctx.config.poll_interval();

    let feed = NotificationFeed::new(ctx.api.clone());
    let gps = GpsTracker::new(ctx.api.clone());

    let mut notification_poller = {
        let feed = feed.clone();
        AccountPoller::new(move |account| feed.watch(account, period))
    };
    notification_poller.set_account(Some(&account));

    // Active rentals define what to track; re-read them every period
    let mut gps_poller: Option<PollHandle> = None;
    let mut tracked: Vec<String> = Vec::new();
    let mut ticker = tokio::time::interval(period);

    // One signal future for the whole loop, so Ctrl-C lands during a fetch too
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    println!("Watching rentals for {} (Ctrl-C to stop)", shorten_address(&account));
    loop {
        if or_shutdown(shutdown.as_mut(), ticker.tick()).await.is_none() {
            break;
        }
        let Some(fetched) =
            or_shutdown(shutdown.as_mut(), ctx.api.rentals_for_renter(&account)).await
        else {
            break;
        };

        match fetched {
            Ok(rentals) => {
                let ids = tracked_ids(&rentals);
                if ids != tracked || gps_poller.is_none() {
                    gps_poller = Some(gps.watch(ids.clone(), period));
                    tracked = ids;
                }
            }
            Err(e) if e.is_unauthorized() => {
                bail!("Session expired - run `carrent login` again");
            }
            Err(e) => warn!(error = %e, "Failed to refresh rentals"),
        }

        let state = feed.state();
        let fixes = gps.snapshot();
        println!(
            "[{}] {} unread notification(s), {} tracked car(s)",
            Local::now().format("%H:%M:%S"),
            state.unread,
            fixes.len()
        );
        for (id, fix) in &fixes {
            println!("    {}: {}", id, fix.maps_url());
        }
    }

    notification_poller.set_account(None);
    drop(gps_poller);
    println!("Stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_shutdown_interrupts_pending_work() {
        let (tx, rx) = oneshot::channel::<()>();
        tokio::pin!(rx);

        assert_eq!(or_shutdown(rx.as_mut(), async { 7 }).await, Some(7));

        tx.send(()).expect("receiver alive");
        let interrupted = or_shutdown(rx.as_mut(), std::future::pending::<()>()).await;
        assert!(interrupted.is_none());
    }
}
