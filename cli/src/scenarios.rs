use std::fmt::Display;
use std::time::Duration;

use anyhow::{Result, anyhow};
use remoter_core::{Deferred, Handler, Payload};
use tokio::time;

fn summary<T: Payload, E: Payload>(
    caller: &str,
    deferred: &Deferred<T, E>,
    value: impl Display,
) -> String {
    let side = match deferred.realm() {
        Some(realm) if realm.is_remote() => "ex",
        _ => "in",
    };
    format!(
        "{caller}: resolved {side}trinsically with value \"{value}\"\n\
         \tfulfilled: {}\n\
         \tresolved: {}\n\
         \trejected: {}\n\
         \trealm: {}\n\
         \tfulfilled remotely: {}\n\
         \tresolved remotely: {}\n\
         \trejected remotely: {}",
        deferred.is_fulfilled(),
        deferred.is_resolved(),
        deferred.is_rejected(),
        deferred
            .realm()
            .map_or_else(|| "none".to_string(), |realm| realm.to_string()),
        deferred.is_fulfilled_remotely(),
        deferred.is_resolved_remotely(),
        deferred.is_rejected_remotely(),
    )
}

pub async fn resolve_extrinsically() -> Result<()> {
    let deferred: Deferred<String, String> = Deferred::new();
    let observed = deferred.then(Handler::arrow(|value: String, instance| {
        if let Some(instance) = instance {
            println!("{}", summary("resolve_extrinsically", instance, &value));
        }
        Ok(())
    }));
    deferred.resolve("Hello extrinsic world!".to_string());
    observed.await.map_err(|e| anyhow!(e))
}

pub async fn resolve_intrinsically() -> Result<()> {
    let deferred: Deferred<String, String> = Deferred::with_initializer(|resolver| {
        resolver.resolve("Hello intrinsic world!".to_string());
        Ok(())
    });
    let observed = deferred.then(Handler::method(|instance, value: String| {
        println!("{}", summary("resolve_intrinsically", instance, &value));
        Ok(())
    }));
    observed.await.map_err(|e| anyhow!(e))
}

/// Sleep by awaiting a Deferred a timer task resolves.
pub async fn sleep(millis: u64) {
    let deferred: Deferred<(), ()> = Deferred::new();
    let timer = deferred.clone();
    tokio::spawn(async move {
        time::sleep(Duration::from_millis(millis)).await;
        timer.resolve(());
    });
    // The timer never rejects.
    let _ = deferred.await;
}

async fn parallel_flow(deferred: Deferred<u32, String>, value: u32) {
    println!("\t\t\t\tDoing something in parallel ...");
    println!("\t\t\t\t... and wait for the result ...");
    time::sleep(Duration::from_millis(500)).await;
    println!("\t\t\t\tInject the value from the parallel execution...");
    println!("\t\t\t\t... and hand back control ...");
    deferred.resolve(value);
}

pub async fn inject_from_parallel_flow(value: u32) -> Result<()> {
    let deferred = Deferred::new();
    println!("main flow\t\t\tparallel flow");
    println!("Starting to do something.. ");
    tokio::spawn(parallel_flow(deferred.clone(), value / 2));
    println!("Doing some other stuff ...");
    println!("...waiting for remote injection...");
    let injected = deferred.clone().await.map_err(|e| anyhow!(e))?;
    println!("And the result: {}", value / 2 + injected);
    println!(
        "injected remotely: {}, oversaturated: {}",
        deferred.is_fulfilled_remotely(),
        deferred.is_oversaturated()
    );
    Ok(())
}
