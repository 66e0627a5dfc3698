//! Solve for the angle of an oblique shock wave, then for a velocity given in
//! different units.
//!
//! Run with `RUST_LOG=relations=debug` to watch the solver work.

use relations::{
    Pairing, Relation, SolveOptions, UnitQuantity, UnitRegistry, Variable,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let units = UnitRegistry::global();

    let theta = Variable::new("theta", units.parse_unit("deg")?)
        .with_description("Slope half angle");
    let beta = Variable::new("beta", units.parse_unit("deg")?)
        .with_description("Shock wave angle");
    let mach = Variable::dimensionless("M").with_description("Mach number");
    let gamma = Variable::dimensionless("gamma")
        .with_magnitude(1.4)?
        .with_description("Specific heat ratio");

    let beta_theta_mach = Relation::new(
        vec![beta.clone(), theta.clone(), mach.clone(), gamma],
        "tan(theta) = 2*(1/tan(beta))*(M^2*sin(beta)^2 - 1)/(M^2*(gamma + cos(2*beta)) + 2)"
            .parse()?,
    )?;
    println!("{}", beta_theta_mach);

    theta.set_value("30 deg".parse::<UnitQuantity>()?)?;
    mach.set_value(4.0)?;
    beta_theta_mach.solve_auto()?;

    beta.convert_to(&units.parse_unit("rad")?)?;
    println!("{}", beta);

    let v1 = Variable::new("v_1", units.parse_unit("m^2/s^2")?)
        .with_magnitude(45.0)?
        .with_description("Velocity at point 1");
    let x1 = Variable::new("x_1", units.parse_unit("ft/s")?);
    let x2 = Variable::new("X_2", units.parse_unit("mi/yr")?);

    let relation =
        Relation::new(vec![x1.clone(), v1.clone()], "x_1^2 = v_1".parse()?)?;
    println!();
    println!("{}", relation.equation());
    println!("{}", relation.expression());

    relation.solve(&[x1, v1.clone()])?;

    // x_2 stands in for x_1, so it has to be matched up by position
    let positional = SolveOptions {
        pairing: Pairing::Positional,
        ..Default::default()
    };
    relation.solve_with(&[x2, v1], &positional)?;

    Ok(())
}
