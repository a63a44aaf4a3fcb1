//! Built-in clinical measurement form.
//!
//! Control ids follow the binding prefixes (`sp`, `csb`, `ln`, `cb`, `xb`,
//! `cmt`); `rdonly_*` patient fields are declared but never bound.

use crate::model::control::ControlDecl;

/// Body-weight control of the built-in form.
pub const BODY_WEIGHT_CONTROL: &str = "spAntropPaino";

/// Lowest value of plain measurement spin boxes ("not measured").
pub const MEASUREMENT_MINIMUM: f64 = -1.0;
/// Lowest value of joint angle inputs ("not measured").
pub const ANGLE_MINIMUM: f64 = -181.0;

const SIDES: [&str; 2] = ["Oik", "Vas"];

const JOINT_ANGLES: &[&str] = &[
    "LonkkaFleksio",
    "LonkkaEkstensio",
    "LonkkaAbduktio",
    "LonkkaSisakierto",
    "LonkkaUlkokierto",
    "PolviFleksio",
    "PolviEkstensioVap",
    "PolviEkstensioAkt",
    "NilkkaDorsifleksioPolviSuora",
    "NilkkaDorsifleksioPolviKoukussa",
    "NilkkaSoleusCatch",
    "NilkkaPlantaarifleksio",
];

const ISOKINETIC_MOVEMENTS: &[&str] = &["PolviEkstensio", "PolviFleksio"];

const ASSISTIVE_DEVICES: &[&str] = &["Ei", "Kävelykepit", "Kyynärsauvat", "Rollaattori", "Pyörätuoli"];
const PAIN_LEVELS: &[&str] = &["Ei kipua", "Lievä", "Kohtalainen", "Voimakas"];

/// Control table of the range-of-motion measurement form.
pub fn clinical_form() -> Vec<ControlDecl> {
    let mut decls = vec![
        ControlDecl::text("rdonly_firstname"),
        ControlDecl::text("rdonly_lastname"),
        ControlDecl::text("rdonly_ssn"),
        ControlDecl::text("rdonly_patient_code"),
        ControlDecl::text("lnTiedotNimi"),
        ControlDecl::text("lnTiedotHetu"),
        ControlDecl::text("lnTiedotMittaajat"),
        ControlDecl::text("lnTiedotPvm"),
        ControlDecl::text("lnKyselyPaivittainenMatka"),
        ControlDecl::choice("cbKyselyApuvaline", ASSISTIVE_DEVICES.iter().copied()),
        ControlDecl::choice("cbKyselyKipu", PAIN_LEVELS.iter().copied()),
        ControlDecl::boolean("xbKyselyKaatuilu"),
        ControlDecl::comment("cmtKysely"),
        ControlDecl::numeric(BODY_WEIGHT_CONTROL, MEASUREMENT_MINIMUM, " kg"),
        ControlDecl::numeric("spAntropPituus", MEASUREMENT_MINIMUM, " cm"),
    ];

    for side in SIDES {
        decls.push(ControlDecl::numeric(
            format!("spAntropAlaraaja{side}"),
            MEASUREMENT_MINIMUM,
            " mm",
        ));
        decls.push(ControlDecl::numeric(
            format!("spVirheasAnteversio{side}"),
            MEASUREMENT_MINIMUM,
            "°",
        ));
        decls.push(ControlDecl::numeric(
            format!("spTasap{side}"),
            MEASUREMENT_MINIMUM,
            " s",
        ));
        decls.push(ControlDecl::boolean(format!("xbTasapSilmatKiinni{side}")));
    }

    for joint in JOINT_ANGLES {
        for side in SIDES {
            decls.push(ControlDecl::angle(format!("csb{joint}{side}"), ANGLE_MINIMUM));
        }
    }

    for movement in ISOKINETIC_MOVEMENTS {
        for side in SIDES {
            decls.push(ControlDecl::numeric(
                format!("spIsokin{movement}{side}NormUn"),
                MEASUREMENT_MINIMUM,
                " Nm",
            ));
            decls.push(ControlDecl::numeric(
                format!("spIsokin{movement}{side}Norm"),
                MEASUREMENT_MINIMUM,
                " Nm/kg",
            ));
        }
    }

    decls.extend([
        ControlDecl::comment("cmtLonkka"),
        ControlDecl::comment("cmtPolvi"),
        ControlDecl::comment("cmtNilkka"),
        ControlDecl::comment("cmtIsokin"),
        ControlDecl::comment("cmtTasap"),
    ]);
    decls
}

#[cfg(test)]
mod tests {
    use super::{clinical_form, BODY_WEIGHT_CONTROL};
    use crate::binding::registry::Registry;

    #[test]
    fn clinical_form_builds_a_registry() {
        let decls = clinical_form();
        let registry = Registry::build(&decls, BODY_WEIGHT_CONTROL).unwrap();

        assert_eq!(registry.len(), decls.len() - 4, "rdonly_* fields stay unbound");
        assert_eq!(registry.derived_controls().count(), 4);
        assert!(registry.by_variable("AntropPaino").is_some());
        assert!(registry.by_variable("cmtLonkka").is_some());
        assert!(registry.by_variable("IsokinPolviEkstensioOikNorm").is_some());
    }
}
