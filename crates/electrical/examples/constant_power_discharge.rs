use electrical::analysis::{RunOptions, run_constant_power, sweep};
use electrical::battery::{BatteryParameters, DischargeSimulator};
use electrical::temperature::{BatteryRating, ThermalModel, derive_parameters};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Same load on a cold, a nominal and a warm cell
    let load_w = 3.87;
    let rating = BatteryRating::default();
    let thermal = ThermalModel::default();
    let options = RunOptions::default();

    println!("ambient_c,r0_ohm,capacity_mah,minutes,final_v");
    for ambient_c in [0.0, 15.0, 25.0, 45.0] {
        let params: BatteryParameters = derive_parameters(&rating, &thermal, Some(ambient_c))?;
        let mut sim = DischargeSimulator::new(params)?;
        let run = run_constant_power(&mut sim, load_w, &options)?;

        println!(
            "{:.1},{:.5},{:.1},{:.1},{:.4}",
            ambient_c,
            params.series_resistance,
            params.capacity_mah(),
            run.summary.elapsed_s / 60.0,
            run.summary.final_voltage.unwrap_or(f64::NAN)
        );
    }

    // Aged cells: R0 grows while the capacity stays put
    println!("\nr0_ohm,minutes,final_v");
    let aged = sweep(
        &[0.05, 0.11, 0.15],
        |r0| BatteryParameters::default().with_series_resistance(r0),
        load_w,
        &options,
    )?;
    for point in aged {
        println!(
            "{:.2},{:.1},{:.4}",
            point.value,
            point.summary.elapsed_s / 60.0,
            point.summary.final_voltage.unwrap_or(f64::NAN)
        );
    }

    Ok(())
}
