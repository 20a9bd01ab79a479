//! Known-good RSA keys and PKCS#1 v1.5 SHA-256 signatures for tests.
//!
//! Every signature covers [`signed_payload`] (3000 bytes). Moduli and `R^2 mod
//! n` values are big-endian byte strings; [`key`] converts them to the word
//! layout the verifier wants.

use crate::rsa::RsaPublicKey;
use hex_literal::hex;

/// The message all fixture signatures were made over.
pub fn signed_payload() -> Vec<u8> {
    (0..SIGNED_LEN).map(|i| (i * 7 + 3) as u8).collect()
}

pub const SIGNED_LEN: usize = 3000;

pub const SIGNED_DIGEST: [u8; 32] =
    hex!("f541874101876255b4baf3a739778d04cb9cba25ffa38b30bc1fb8b0701f2a45");

pub struct Fixture<const BYTES: usize> {
    pub n: [u8; BYTES],
    pub rr: [u8; BYTES],
    pub n0inv: u32,
    pub sig: [u8; BYTES],
}

/// Builds a key from a fixture's big-endian values.
pub fn key<const WORDS: usize, const BYTES: usize>(
    f: &Fixture<BYTES>,
) -> RsaPublicKey<WORDS> {
    assert_eq!(WORDS * 4, BYTES);
    let mut n = [0; WORDS];
    let mut rr = [0; WORDS];
    for i in 0..WORDS {
        let at = (WORDS - 1 - i) * 4;
        n[i] = u32::from_be_bytes(f.n[at..at + 4].try_into().unwrap());
        rr[i] = u32::from_be_bytes(f.rr[at..at + 4].try_into().unwrap());
    }
    RsaPublicKey { n0inv: f.n0inv, n, rr }
}

/// RSA-2048, e = 65537.
pub const RSA2048_F4: Fixture<256> = Fixture {
    n: hex!(
        "e52108bfd35b4bef3f993312ef2a4e89d9e3ec40342c7e975d3934e5192d53cf"
        "bc970d93ccc1a4cc22845b9d59414c3c5fc40ca0240b3515e41b343b9ad17eb6"
        "0e4c95da136f41d5b0d6f7da89636b19b54902765a5476362fce5599fefbe4ad"
        "2656bc147fd740c8fbe9a995d1fbbd84b5ebe0dc6b94885365b41c037117c234"
        "fde1121b49ac5ad0d1b9606f78ce06644db3a8c798117024429e34436a60f595"
        "95fbd853f2933f06330e65e7152417b7e6e389aa9f9eaa179829728f137a2f9b"
        "a775ba78a6ce26f4dedab2e23e73f54695a6cf4104a27aa3a9c7a589478ccb81"
        "efa438682236162b18f9e3d42c5f61653fbc0724ee5271366b0d1c1275510e85"
    ),
    rr: hex!(
        "4374b8d1467c01a89fb2487a7fbce70d4239e55b85daeccd86602edb0462a2a3"
        "21738aa7e5fdd132ed70a5f97f860b6ad297b854cc8dd70910a16ee5c020439f"
        "169fcf62efaadf6a07fd30ad747a7fe37bcbbd4bfe3ac1ffa140503e20a6fbfb"
        "759025da5562298436380977070e858ae618b45ff665f209935e1755f8be4fc4"
        "6b1b3d1ba013193ecb79e1d2e5d85b2cfbcfa26cdbc1a126d9bf7d5d06593fb1"
        "2badf380afb45d80a11458897bf420b28c43a7fd2407a4673ac611ad9801d9f0"
        "bafe500d343c8a3aa8314cd3ab4aa7daf0330c081e1ce044617fb496a40991f3"
        "d7cf3a2acdad3603ab2149f61f64b72abe82c83a7dcf63b587f3f19a32f7eb9c"
    ),
    n0inv: 0xbc9545b3,
    sig: hex!(
        "7bdfb98502777a541982b4e2041b1aa7df212f3af4a80991c08ff944066ca7d8"
        "09e33f0d46b349dd30ce7934f5b9afc721c159adcdc5ef439df07edf6828ba3d"
        "c1832eafa959172579b48419e8836c919901288a2f709e0457c39e90c27b9aa6"
        "064078356c8f105fc73e219394b6dbd6506851398dd71f308766b5f30421238d"
        "36ece81bb79818cbe6418320631c3e4645514ffa9e6995f2a882aa2e00a252e7"
        "762186778a4a4d27f3c1975d9aae9754885d2bb3f55a633b7336c0e8662c6171"
        "5ae6233a7e5ffbf232baf19e4a0b8fe181ccfd2ba6ae29f53190416d04cd0380"
        "4caa0341e2e3975d85175602ffbb1ea7568b75e7648384edc346e73aecdf3e18"
    ),
};

/// RSA-3072, e = 65537.
pub const RSA3072_F4: Fixture<384> = Fixture {
    n: hex!(
        "d7c33c6b2f40406b10accb9183202fb934fe445e2fe6f30e1d97afb827667a06"
        "d3dba96bb02a6616646f6eeec1e521e40fced2b10935108cc4197cc6ed8cb747"
        "75089bfb932ff0c962bc7567e53943aaf4dc02da23a539430ac17995dd44e9c6"
        "577d576e69255ebb3530618880c6e4633611724fd92b20395b42cf73c4092637"
        "28fa0b0ce5fdad496b3cab35fd50024bd2fbdb0a8482f1b89c1a2c0743a609a6"
        "9e0dc3efcb73cdc98a982d53686586ed0c0ce9364203b4d9d6621be600fb2618"
        "6a73f798e1c13f3420941edc188eedd660ef93d6b2821d7831c9a7f44a295615"
        "99f30b0d349da66e3e4608a275ac6640605823dc3e450ac458ba2820ecb064b2"
        "84f6baf06382c19f332d67fea240b7c33cfab103e69eda2887372a8825b6bcb2"
        "769ce4c6bc65c6823bcacb4a502b0fd55e0ee205c7b3732a7dfaeb83c9d4be28"
        "abfc99cc07e2ccf1a0cbe504decbc83c85c050bf93a5e265e777a83274e2326e"
        "179d2bd4e65467a9e7ec7b6a8a5344f6aca38abf18c9681a4871f934f3490387"
    ),
    rr: hex!(
        "c656519513dc0696e7cafa54c9b83feac829abfb2092fdb1633311857f41b14d"
        "686751e28944cf15fc38bf0a927dc6519feb3f5d20bd4362a2112170ece198fc"
        "063eaf66d3032ff274dc170b2df05e187c4f2ab3a9119b64bf2c1379dea86157"
        "b648605997d5335528fcf33ad3403c978f3c632ed20485842a5c183ceb21f75e"
        "5f8ffa147ccadfde310846f0f0c551669b2adeeb4053e65e0a1d703646e830e0"
        "8463375ac125fecc65085febd65ddf9f23674e06469c6159134bbd33ac3d453e"
        "da336dcfa95a54262119312109f2486ad63b312e33050d86b172bfacdbf48cbf"
        "d37179eee27e7861da48766f91009ac01610e94e972828c2b6946b605c1e5a36"
        "dd31c9fd739e8f5ef51b73971e812d0d26d5e4f1670fa74bae92c36896c2630d"
        "076e950ef37c8681f13c954b3f678afe90c28fb16deada907f9d5fcb9d5681e4"
        "c9cee71ca1fe913688bd71c5859807e443afc52ec71a7d1b3a72de63190eabcf"
        "1db76ee8fc6d69278e2aad5d9cb46a50bd2cc2e6045ad4808c0c5e929d813cc9"
    ),
    n0inv: 0xffe6adc9,
    sig: hex!(
        "8fc3cd5795ed29453df4975079f3314c8acd27888d4feedec796d91e79877741"
        "e91a86a7be281bb47699d68565d2efbb758a657d562098842a8915d4cc5fb2c8"
        "4875d2e6e2b45baec36633c769580bfc3101f61ff967520740899d06e21ab7f1"
        "ffb35c1ffaff04521ba6434bdc089ae61bf3e257ae5a9e1e22e36e1e805a7376"
        "e16f27ec654c1116dfd213e3ea09460b8d613fd06dd2923d169f7a2f0a63e3d0"
        "92e95c0e7e8350b1fb696c4256f5a7e1c1714fe12b2f78d1dd831dce9596f6a2"
        "f8004b431638c0dab110a8cddb26d807e4318e6e801aab888d6571cca44f03a3"
        "864fe2fda80f04b528025575384629c67a518a2aa64e706763b1a38d009e44d0"
        "b9adeeb5d486461c3d8a0d893c0bb725394c983392f8431c798cdf21f4db86fe"
        "64a2c9ba20c342ebb4df6c25534cde3e3a38db721288a8cb9d798cbdae6e5ace"
        "b5dfff8ac78c2b29ce8c1af7c72c88e6443f3f30ac70cdd00064f93f4125309b"
        "de4bb915561b1c0361d3cdce8ef559cefc2d1766c1fd46ea6de093f377d889a0"
    ),
};

/// RSA-4096, e = 65537.
pub const RSA4096_F4: Fixture<512> = Fixture {
    n: hex!(
        "c13e9dc04411bc38416c06a1d135c9fc32177861ec4a0d615ca1432ecc7b24ec"
        "a3f8eb465e4a19acd3a5dbd052eb9ed03f4ff2dfb78e6ba62cfb2851d3eeda2e"
        "22534532fe1b7c33d8f0591949cdba3921a8a6b875eb443e2b99f3b7e990c3b1"
        "f4e3f46e67ac6a03c0aa259d6474ca74cc1bf9553374dca81a81d5b68aa5d920"
        "1deed2f8f2b1d14ae14acc7da75c28fe0db04dfdedc7b5ae0cd60bf83dd6cb3d"
        "0e78da7d22d320df4e6b3c468479807fda448c019635c941e84dbaa0b8d311ed"
        "36dad990420d8b7c88b7498c29995bd1e646033a8411b7257fc9fd67e8140b34"
        "5d3834d2e08adba9029a2f68e4a791e831ba42a0325cbb745cb0b5f82566da1d"
        "6541a0b5dabf24022291ce63accb28726fb53130699e1dac94d93c7240a3b987"
        "0e98203a7b13bcdc8f6d1ea7c5b92a0395d1c804635c5c3d69cb9fac94c3f541"
        "426d237655da0ecb7a29e1fabad1e7219d9ff6ed3d98832d3933bcca9358d25c"
        "e0afdab6463163adf832cec947fdbb89bc5be8b5c642f3a152c61a1114af3890"
        "8d56608aace07e1106eabc69663fa9f0fc9a95a56f6b3ca4fdcb388a879b6b8a"
        "1ac5471f4cf4c8d808afd430ae52908c927f697f7343708c1b29515f86b30bd7"
        "7d9a969051760e17e74cf78535643b43e72ac19da1b3c3855779061f99b1215a"
        "b637687e5c9527b75c238ab50d4657a45b823d16c373fe482984cea128f4360d"
    ),
    rr: hex!(
        "0f6668c6e0d24e24c10b526cd8eee58558a12fc3e30c7427a6960034483ef317"
        "1dea261b81d26cc973ac17cb11e33673967c88d1dce3e8247125449ef4bde73d"
        "f99c95b466b9b6ab642094815c5e0c81ecf28683d37ff21fafa2152236460f0e"
        "f33f30e3cd184b841e824f27f84b34617d301676a9659927ff8fc2053a015bb8"
        "4389ba53e5e4b19444e133552b61cdab1de34ef46b356396568b38902eda1376"
        "40b0e058e74ed5c1a5c2a6cfe0d4c25e133ef6ae3298964bded9d845b35fd3b1"
        "107f537062a3063afbce4a98a0a606fddcc2d15b08bf3c8f395e7e47b50e48ed"
        "7159011843f5bfaad1471de829695109a9c24c71f9ce586266f1a6a9435b9a49"
        "5827a3ed27b81693bda28f8dd3f9631c249671f14c6da9ffe4e1b9d64f2e1f16"
        "4867fe82c820460257eecc71c8f49179bf0a8416311b75fec319276b2046185c"
        "4f2115518f9e09f32b410cceb9bb86954f00fb496d912336ebad36b5aef98f03"
        "3c912d30a8e6939fa152f630325df5a37174ccec66099ce7e86de605ee6ecb36"
        "ca2d55c274bb8a5d1cdf4ebad131a34b103a1d72b2ed68958078e6ecd03b9f2f"
        "d07e50d6e5fc6d35076c68371a0d4513903c695914ae3998add09c6321ae5abf"
        "dd826f7545ffc495aeb555a8c8343197982820379ad955ba49d47a6467298b3b"
        "5d163e9fae6e24de516c97e47e14dd7af1a2462fb7e93845e0ff12f32a41a566"
    ),
    n0inv: 0xe295f73b,
    sig: hex!(
        "a03f4b8c8c7630916f3af88cdf031c2e67e0fa2596f0402812bc407a0a1b8adf"
        "e6742e5709e503a3f5e8c94d6658edd317e2bf2dc20183e849756024c4c8f1ed"
        "047fc7d781d8f50b91108fb68ea66c6558231cea9c83a94d3fff0622e194bee5"
        "477b5c9c8deb5b411494f4a0e581f32b90a531e04b42f86415af36ec42773566"
        "796ce7b9e342e12030c6326327963412d30f974598fa6d82eb9e4290728e180e"
        "fc32126090d66e51e34053eb56cbe6f05658a22b1f65f385507a1ec5c4906112"
        "ff7f4b9b76be0175548aed9301565220df2fc9990ece4e3f799be44b555fb6dc"
        "2dc6f2dc940d45982cd2379469d65d253decd854522478901c9d2daceccd3104"
        "831e594d9080df358f146cb8fe825cc1270065defe98f5a522c53bb9bea5718d"
        "709d35fd28b41999abe9d8827682a2b6f4c5eccd3158f7700473d5b0c45b9e4a"
        "66584581e601ac19ef749234011880924626760e6101321dbdbfa9561ad6c198"
        "6aa16293334e4a4a7f28fe7386af3a9f847d7551e93c8323af656bde94c1fcfe"
        "642431f0e7f943a75c67ce53df4a995c8314b7a64a7ba0bf824ad2f431de2e38"
        "ab798f4490a822051c81c84cb70d173f3497b7d4a91db9cc484c14f75baa4644"
        "e3569bb2a00b762529ac6bae8d6bda8ecfbbd0f596b2e70389a5cc1b5956f6ff"
        "4be0e20254457199a76b7b1ec1b4e3d18902c3c34e0f3d408351c12a0a28df81"
    ),
};

/// RSA-2048, e = 3.
pub const RSA2048_E3: Fixture<256> = Fixture {
    n: hex!(
        "c3129dbb1770cbdee54301d207448910d24a2b86ffb0870cbc534f61c998e92b"
        "2a660c7af9a2305328500cb094bdc62bdc6fb8433477281f7c0c4b98e4580e01"
        "8b1475b9a1eac41a1feee3013953d4b6b0463f376c02c084f6656293b098f57a"
        "bd7c2c3832e88c7fb7c1e3c5d61e36e486d470094505f72bc7a2a7dbd94649d0"
        "5c6cc618fc19fb48baeb1bf6987094bf5fd3ac41fd610e06b40ce2e97fa1340e"
        "a1f6380fade469aa91ed38c0674038164d98a4e7c5728db390d6bf326d13d51c"
        "c4c63bc6652a5571e43ff4e6cb363fd9b2e8597ae0c5999f8a850cc6576210d1"
        "09be74b140d8fa9a498dc80f4d592ca337276a32318e1e465d37be7650235ae3"
    ),
    rr: hex!(
        "9e780d4463c6c3769efa3d0df2274a8328b12dd42e0de95a7764a2b0ac3c9aac"
        "9cdb9f1427c9b44c8f49a47636cb426c9e819e56f9551c807739e368ea11c4a6"
        "ae3ae734b84e86b41b9d276a2d9fd9f9e3c083dbfcc998ba6d98ab2a8c1300f7"
        "a79a8c4663122d2b0f0762eee0262b48ee98160fdebdf7e7dfc7c211fbd3a9aa"
        "347b5cb410c346faa55219b358095ab102e93846196140720ccc6f8e49f64f34"
        "b515c97c74ec0caf9fb9a20118d204e8cf0fbf6bcc271a0d376107d06d66f252"
        "89d63318fdb186449b41bee08d07db79dd811917c706cb4073ea8409bf8e5c23"
        "13e666abcdc623297ae1619d5d2cf6201fbfa65e2f8c24602cd59d14387feabc"
    ),
    n0inv: 0xb6454535,
    sig: hex!(
        "711f9253af24c3e88d19c1b6597dcaaf2ac1e1ab7347822b1676a19dec48784e"
        "807896354538b8db412f6d79dd5ba989437537bf11864f957e7fb4a63fe29e6b"
        "be17ea92cd0d877e10d854f3fc3f4cc5f0c5465f5cede6dd6ff04e95cb5726de"
        "3666ef93cafffa639c1bdac6506ef7fa65b20a15e2fd05530f8338adb1b92580"
        "00c0cce43740c6ab8463496930335ba6ba1f28f826ab6b6ceefc487ebebfc981"
        "3f8242fcee7d5c10f933322e1d60c84a46e5533b2dbf65db2cef01a2892e0634"
        "fa99c9758ede0c9eba8731ea2cc19652b8cc595465a84021f03e5be1e9121337"
        "39bd58ff3610b255a41fa99414f4fb868b5873866922d3394687a4a4a86f61cf"
    ),
};
